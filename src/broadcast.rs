//! Room-scoped message delivery
//!
//! A [`Room`] is a snapshot of the sessions bound to one lobby. Game logic
//! pushes updates through it without knowing how sessions are connected.

use super::{SyncMessage, UpdateMessage, registry::Id, session::Tunnel};

/// The members of one lobby's broadcast room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Room {
    members: Vec<Id>,
}

impl Room {
    /// Creates a room from its member sessions
    pub fn new(members: Vec<Id>) -> Self {
        Self { members }
    }

    /// The member sessions of this room
    pub fn members(&self) -> &[Id] {
        &self.members
    }

    /// Sends an update to every member
    pub fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        self.announce_with(|_| Some(message.to_owned()), tunnel_finder);
    }

    /// Sends an update to every member but one
    pub fn announce_except<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        except: Id,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        self.announce_with(
            |id| (id != except).then(|| message.to_owned()),
            tunnel_finder,
        );
    }

    /// Sends personalized updates, skipping members the sender returns `None` for
    pub fn announce_with<S, T: Tunnel, F: Fn(Id) -> Option<T>>(&self, sender: S, tunnel_finder: F)
    where
        S: Fn(Id) -> Option<UpdateMessage>,
    {
        for id in &self.members {
            let Some(message) = sender(*id) else {
                continue;
            };

            send_message(&message, *id, &tunnel_finder);
        }
    }
}

/// Sends an update to a single session, if it still has a tunnel
pub fn send_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
    message: &UpdateMessage,
    id: Id,
    tunnel_finder: F,
) {
    let Some(session) = tunnel_finder(id) else {
        return;
    };

    session.send_message(message);
}

/// Sends a state snapshot to a single session, if it still has a tunnel
pub fn send_state<T: Tunnel, F: Fn(Id) -> Option<T>>(
    state: &SyncMessage,
    id: Id,
    tunnel_finder: F,
) {
    let Some(session) = tunnel_finder(id) else {
        return;
    };

    session.send_state(state);
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::lobby;

    /// Recording tunnels, one inbox per session
    #[derive(Debug, Clone, Default)]
    pub struct Inboxes {
        messages: Arc<Mutex<HashMap<Id, VecDeque<UpdateMessage>>>>,
        states: Arc<Mutex<HashMap<Id, VecDeque<SyncMessage>>>>,
    }

    #[derive(Debug, Clone)]
    pub struct MockTunnel {
        id: Id,
        inboxes: Inboxes,
    }

    impl Tunnel for MockTunnel {
        fn send_message(&self, message: &UpdateMessage) {
            self.inboxes
                .messages
                .lock()
                .unwrap()
                .entry(self.id)
                .or_default()
                .push_back(message.clone());
        }

        fn send_state(&self, state: &SyncMessage) {
            self.inboxes
                .states
                .lock()
                .unwrap()
                .entry(self.id)
                .or_default()
                .push_back(state.clone());
        }
    }

    impl Inboxes {
        pub fn finder(&self) -> impl Fn(Id) -> Option<MockTunnel> + '_ {
            move |id| {
                Some(MockTunnel {
                    id,
                    inboxes: self.clone(),
                })
            }
        }

        pub fn messages(&self, id: Id) -> Vec<UpdateMessage> {
            self.messages
                .lock()
                .unwrap()
                .get(&id)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default()
        }

        pub fn states(&self, id: Id) -> Vec<SyncMessage> {
            self.states
                .lock()
                .unwrap()
                .get(&id)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default()
        }

        pub fn clear(&self) {
            self.messages.lock().unwrap().clear();
            self.states.lock().unwrap().clear();
        }
    }

    fn paused(message: &str) -> UpdateMessage {
        lobby::UpdateMessage::TurnPaused {
            message: message.to_owned(),
        }
        .into()
    }

    #[test]
    fn test_announce_reaches_every_member() {
        let inboxes = Inboxes::default();
        let (a, b) = (Id::new(), Id::new());
        let room = Room::new(vec![a, b]);

        room.announce(&paused("hi"), inboxes.finder());

        assert_eq!(inboxes.messages(a).len(), 1);
        assert_eq!(inboxes.messages(b).len(), 1);
    }

    #[test]
    fn test_announce_except_skips_one() {
        let inboxes = Inboxes::default();
        let (a, b) = (Id::new(), Id::new());
        let room = Room::new(vec![a, b]);

        room.announce_except(a, &paused("hi"), inboxes.finder());

        assert!(inboxes.messages(a).is_empty());
        assert_eq!(inboxes.messages(b).len(), 1);
    }

    #[test]
    fn test_missing_tunnel_is_skipped() {
        let a = Id::new();
        let room = Room::new(vec![a]);
        let finder = |_id: Id| -> Option<MockTunnel> { None };

        room.announce(&paused("hi"), finder);
        send_message(&paused("hi"), a, finder);
    }
}
