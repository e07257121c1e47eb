//! Communication session management
//!
//! This module defines the trait for tunneling messages between the engine
//! and connected clients. The host decides what a tunnel is (a WebSocket, an
//! SSE stream, a test recorder); the engine only needs to push
//! messages through it.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending messages through a communication tunnel
pub trait Tunnel {
    /// Sends an incremental update to the client
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full state snapshot to the client
    ///
    /// Sync messages are sent when a session joins or rejoins a lobby so it
    /// can rebuild its whole view at once.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to send
    fn send_state(&self, state: &SyncMessage);
}
