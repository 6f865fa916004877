mod encoder;
mod handshake;
mod parser;
mod socket;
mod types;

pub use encoder::{encode_frame, encode_message};
pub use handshake::accept_key;
pub use parser::FrameDecoder;
pub use socket::{Callback, WebSocket};
pub use types::{
    clear_kill, is_killed, kill, kill_reason, Message, Opcode, SocketState, WsError,
};
