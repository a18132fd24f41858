//! Outbound seam to the room-based messaging layer
//!
//! The simulation never speaks a wire protocol itself. Each session hands its
//! snapshots and lifecycle notifications to a [`Transport`], at most once per
//! broadcast or timer tick.

use tokio::sync::mpsc;
use tracing::warn;

use crate::game::match_result::MatchResult;
use crate::game::state::SessionId;
use crate::net::protocol::{encode, ProtocolError, ServerMessage, StateSnapshot};

pub trait Transport: Send + Sync {
    fn broadcast_state(&self, session_id: SessionId, snapshot: StateSnapshot);

    fn broadcast_timer_tick(&self, session_id: SessionId, remaining_ms: u64);

    fn broadcast_paused(&self, session_id: SessionId, initiator_name: Option<String>, remaining_ms: u64);

    fn broadcast_resumed(&self, session_id: SessionId, remaining_ms: u64);

    fn broadcast_ended(&self, session_id: SessionId, result: MatchResult);
}

/// One message addressed to every client of a session
#[derive(Debug, Clone)]
pub struct Outbound {
    pub session_id: SessionId,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn encoded(&self) -> Result<Vec<u8>, ProtocolError> {
        encode(&self.message)
    }
}

/// Forwards every message over an unbounded tokio channel. Sends after the
/// receiver is gone are dropped with a warning.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, session_id: SessionId, message: ServerMessage) {
        let kind = message.kind();
        if self.tx.send(Outbound { session_id, message }).is_err() {
            warn!("Dropped {} for session {}: receiver closed", kind, session_id);
        }
    }
}

impl Transport for ChannelTransport {
    fn broadcast_state(&self, session_id: SessionId, snapshot: StateSnapshot) {
        self.send(session_id, ServerMessage::Snapshot(snapshot));
    }

    fn broadcast_timer_tick(&self, session_id: SessionId, remaining_ms: u64) {
        self.send(session_id, ServerMessage::TimerTick { remaining_ms });
    }

    fn broadcast_paused(&self, session_id: SessionId, initiator_name: Option<String>, remaining_ms: u64) {
        self.send(
            session_id,
            ServerMessage::Paused {
                initiator_name,
                remaining_ms,
            },
        );
    }

    fn broadcast_resumed(&self, session_id: SessionId, remaining_ms: u64) {
        self.send(session_id, ServerMessage::Resumed { remaining_ms });
    }

    fn broadcast_ended(&self, session_id: SessionId, result: MatchResult) {
        self.send(session_id, ServerMessage::Ended(result));
    }
}
