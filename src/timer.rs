//! Turn timer
//!
//! Each lobby owns one [`Timer`]. The countdown is driven by one-second
//! [`AlarmMessage::Tick`] alarms scheduled through the host. Every start
//! mints a new token, and a tick whose token no longer matches is stale, so
//! restarting or cancelling never leaves a second countdown running.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{mode::GameMode, registry::Id};

/// Alarm messages for the turn timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One countdown step for a lobby's timer
    Tick {
        /// Mode of the lobby owning the timer
        mode: GameMode,
        /// Name of the lobby owning the timer
        lobby: String,
        /// Token of the countdown that scheduled this tick
        token: Id,
    },
}

/// What a tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The tick belongs to a cancelled or replaced countdown
    Stale,
    /// The countdown is paused; nothing changed
    Paused,
    /// One second elapsed, this many remain
    Remaining(u64),
    /// The countdown reached zero and is now stopped
    Expired,
}

/// A cancellable, pausable countdown
#[derive(Debug, Clone, Default)]
pub struct Timer {
    token: Option<Id>,
    time_left: u64,
    paused: bool,
}

impl Timer {
    /// Starts a fresh countdown, replacing any running one
    ///
    /// # Arguments
    ///
    /// * `duration` - Length of the countdown, whole seconds are used
    /// * `mode` - Mode of the owning lobby
    /// * `lobby` - Name of the owning lobby
    /// * `schedule_message` - Function to schedule the first tick
    pub fn start<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        duration: Duration,
        mode: GameMode,
        lobby: &str,
        schedule_message: S,
    ) {
        self.token = Some(Id::new());
        self.time_left = duration.as_secs();
        self.paused = false;

        log::debug!("{mode} lobby {lobby:?}: timer started with {}s", self.time_left);

        self.schedule_tick(mode, lobby, schedule_message);
    }

    /// Schedules the next tick of the active countdown, if any
    pub fn schedule_tick<S: FnMut(crate::AlarmMessage, Duration)>(
        &self,
        mode: GameMode,
        lobby: &str,
        mut schedule_message: S,
    ) {
        let Some(token) = self.token else {
            return;
        };

        schedule_message(
            AlarmMessage::Tick {
                mode,
                lobby: lobby.to_owned(),
                token,
            }
            .into(),
            Self::interval(),
        );
    }

    /// Applies one tick to the countdown
    ///
    /// Reaching zero stops the countdown, so `Expired` is reported at most
    /// once per start.
    pub fn tick(&mut self, token: Id) -> Tick {
        if self.token != Some(token) {
            return Tick::Stale;
        }
        if self.paused {
            return Tick::Paused;
        }

        self.time_left = self.time_left.saturating_sub(1);

        if self.time_left == 0 {
            self.token = None;
            Tick::Expired
        } else {
            Tick::Remaining(self.time_left)
        }
    }

    /// Freezes the countdown at its current value
    pub fn pause(&mut self) {
        if self.is_running() {
            self.paused = true;
        }
    }

    /// Lets a paused countdown continue from where it stopped
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stops the countdown; pending ticks become stale
    pub fn cancel(&mut self) {
        self.token = None;
        self.paused = false;
    }

    /// Whether a countdown is active (possibly paused)
    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Whether the active countdown is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Seconds left on the countdown
    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    /// Delay between two ticks
    pub fn interval() -> Duration {
        Duration::from_secs(crate::constants::timer::TICK_SECONDS)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn started(seconds: u64) -> (Timer, Id) {
        let mut timer = Timer::default();
        let mut scheduled = Vec::new();
        timer.start(
            Duration::from_secs(seconds),
            GameMode::QuestionDare,
            "room1",
            |message, delay| scheduled.push((message, delay)),
        );
        assert_eq!(scheduled.len(), 1);
        let (crate::AlarmMessage::Timer(AlarmMessage::Tick { token, .. }), delay) =
            scheduled.remove(0);
        assert_eq!(delay, Timer::interval());
        (timer, token)
    }

    #[test]
    fn test_counts_down_and_expires_once() {
        let (mut timer, token) = started(3);

        assert_eq!(timer.tick(token), Tick::Remaining(2));
        assert_eq!(timer.tick(token), Tick::Remaining(1));
        assert_eq!(timer.tick(token), Tick::Expired);
        assert_eq!(timer.tick(token), Tick::Stale);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_paused_ticks_do_not_decrement() {
        let (mut timer, token) = started(10);
        timer.tick(token);
        timer.pause();

        for _ in 0..100 {
            assert_eq!(timer.tick(token), Tick::Paused);
        }
        assert_eq!(timer.time_left(), 9);

        timer.resume();
        assert_eq!(timer.tick(token), Tick::Remaining(8));
    }

    #[test]
    fn test_restart_makes_old_ticks_stale() {
        let (mut timer, old) = started(10);
        let mut scheduled = Vec::new();
        timer.start(
            Duration::from_secs(5),
            GameMode::QuestionDare,
            "room1",
            |message, _| scheduled.push(message),
        );

        assert_eq!(timer.tick(old), Tick::Stale);
        assert_eq!(timer.time_left(), 5);
    }

    #[test]
    fn test_cancel() {
        let (mut timer, token) = started(10);
        timer.cancel();
        assert_eq!(timer.tick(token), Tick::Stale);
        assert!(!timer.is_paused());
    }

    #[test]
    fn test_schedule_tick_reuses_token() {
        let (timer, token) = started(10);
        let mut scheduled = Vec::new();
        timer.schedule_tick(GameMode::QuestionDare, "room1", |message, _| {
            scheduled.push(message);
        });
        let [crate::AlarmMessage::Timer(AlarmMessage::Tick { token: next, .. })] =
            scheduled.as_slice()
        else {
            panic!("expected exactly one tick");
        };
        assert_eq!(*next, token);

        let mut idle = Timer::default();
        idle.cancel();
        idle.schedule_tick(GameMode::QuestionDare, "room1", |_, _| {
            panic!("a stopped timer must not schedule");
        });
    }

    #[test]
    fn test_pause_without_countdown_is_noop() {
        let mut timer = Timer::default();
        timer.pause();
        assert!(!timer.is_paused());
    }
}
