use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// One complete WebSocket message, reassembled across continuation frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn text(text: &str) -> Self {
        Self {
            opcode: Opcode::Text,
            payload: text.as_bytes().to_vec(),
        }
    }

    pub fn binary(payload: &[u8]) -> Self {
        Self {
            opcode: Opcode::Binary,
            payload: payload.to_vec(),
        }
    }

    pub fn ping(payload: &[u8]) -> Self {
        Self {
            opcode: Opcode::Ping,
            payload: payload.to_vec(),
        }
    }

    pub fn pong(payload: &[u8]) -> Self {
        Self {
            opcode: Opcode::Pong,
            payload: payload.to_vec(),
        }
    }

    pub fn close() -> Self {
        Self {
            opcode: Opcode::Close,
            payload: Vec::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SocketState {
    #[default]
    Open,
    CloseSent,
    CloseReceived,
    Closed,
}

#[derive(Debug, Error)]
pub enum WsError {
    #[error("invalid opcode {0:#x}")]
    InvalidOpcode(u8),
    #[error("control frame must not be fragmented")]
    FragmentedControl,
    #[error("continuation frame without a message in progress")]
    StrayContinuation,
    #[error("websocket io error: {0}")]
    Io(#[from] std::io::Error),
}

// One socket per worker, so the kill switch is process-wide. Set when the
// peer disappears or framing breaks; cleared when a new socket is taken over.
static KILL: AtomicBool = AtomicBool::new(false);
static KILL_REASON: Mutex<Option<String>> = Mutex::new(None);

pub fn kill(reason: &str) {
    KILL.store(true, Ordering::Release);
    if let Ok(mut slot) = KILL_REASON.lock() {
        *slot = Some(reason.to_string());
    }
}

pub fn is_killed() -> bool {
    KILL.load(Ordering::Acquire)
}

pub fn kill_reason() -> Option<String> {
    KILL_REASON.lock().ok().and_then(|slot| slot.clone())
}

pub fn clear_kill() {
    KILL.store(false, Ordering::Release);
    if let Ok(mut slot) = KILL_REASON.lock() {
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{clear_kill, is_killed, kill, kill_reason, Opcode};

    #[test]
    fn opcode_bits_round_trip() {
        for bits in [0x0, 0x1, 0x2, 0x8, 0x9, 0xA] {
            assert_eq!(Opcode::from_bits(bits).unwrap().bits(), bits);
        }
        assert!(Opcode::from_bits(0x3).is_none());
        assert!(Opcode::from_bits(0xF).is_none());
    }

    #[test]
    fn kill_switch_records_a_reason() {
        clear_kill();
        assert!(!is_killed());

        kill("peer vanished");
        assert!(is_killed());
        assert_eq!(kill_reason().as_deref(), Some("peer vanished"));

        clear_kill();
        assert!(!is_killed());
        assert!(kill_reason().is_none());
    }
}
