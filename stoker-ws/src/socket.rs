use std::io::{ErrorKind, Read, Write};

use stoker_http::ByteBuffer;
use tracing::debug;

use crate::encoder::{encode_frame, encode_message};
use crate::parser::FrameDecoder;
use crate::types::{kill, Message, Opcode, SocketState, WsError};

pub type Callback = Box<dyn FnMut(&Message) -> bool + Send>;

/// A WebSocket over any byte stream. Outbound data that does not fit the
/// socket right now is retained in `leftover` and drained on the next send
/// or an explicit flush.
pub struct WebSocket<S: Read + Write> {
    stream: S,
    decoder: FrameDecoder,
    leftover: ByteBuffer,
    state: SocketState,
    masked: bool,
    on_text: Option<Callback>,
    on_binary: Option<Callback>,
    on_close: Option<Callback>,
    on_message: Option<Callback>,
}

impl<S: Read + Write> WebSocket<S> {
    /// Server side: outbound frames are unmasked.
    pub fn new(stream: S) -> Self {
        Self::with_role(stream, false)
    }

    /// Client side: outbound frames are masked.
    pub fn client(stream: S) -> Self {
        Self::with_role(stream, true)
    }

    fn with_role(stream: S, masked: bool) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            leftover: ByteBuffer::new(),
            state: SocketState::Open,
            masked,
            on_text: None,
            on_binary: None,
            on_close: None,
            on_message: None,
        }
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Unsent bytes waiting for the socket to accept more data.
    pub fn pending(&self) -> usize {
        self.leftover.len()
    }

    pub fn on_text(&mut self, callback: impl FnMut(&Message) -> bool + Send + 'static) {
        self.on_text = Some(Box::new(callback));
    }

    pub fn on_binary(&mut self, callback: impl FnMut(&Message) -> bool + Send + 'static) {
        self.on_binary = Some(Box::new(callback));
    }

    pub fn on_close(&mut self, callback: impl FnMut(&Message) -> bool + Send + 'static) {
        self.on_close = Some(Box::new(callback));
    }

    pub fn on_message(&mut self, callback: impl FnMut(&Message) -> bool + Send + 'static) {
        self.on_message = Some(Box::new(callback));
    }

    pub fn send_text(&mut self, text: &str) -> std::io::Result<usize> {
        self.send(&Message::text(text))
    }

    pub fn send_binary(&mut self, payload: &[u8]) -> std::io::Result<usize> {
        self.send(&Message::binary(payload))
    }

    pub fn send_ping(&mut self, payload: &[u8]) -> std::io::Result<usize> {
        self.send(&Message::ping(payload))
    }

    pub fn send_close(&mut self) -> std::io::Result<usize> {
        self.send(&Message::close())
    }

    /// Encode and send one message. Returns the bytes actually written; the
    /// unsent tail, if any, lands in the leftover buffer.
    pub fn send(&mut self, message: &Message) -> std::io::Result<usize> {
        if self.state == SocketState::Closed {
            return Ok(0);
        }

        if message.opcode == Opcode::Close {
            self.state = match self.state {
                SocketState::CloseReceived => SocketState::Closed,
                _ => SocketState::CloseSent,
            };
        }

        self.flush()?;
        let frame = encode_message(message, self.masked);
        self.write_or_buffer(&frame)
    }

    /// Drain the leftover buffer as far as the socket allows.
    pub fn flush(&mut self) -> std::io::Result<usize> {
        if self.leftover.is_empty() {
            return Ok(0);
        }

        let pending = self.leftover.as_slice().to_vec();
        let written = self.write_available(&pending)?;
        self.leftover.clear();
        self.leftover.append(&pending[written..]);
        Ok(written)
    }

    /// Read whatever the socket has and run the callback dispatch for every
    /// completed message. Returns the number of messages handled.
    pub fn receive(&mut self) -> Result<usize, WsError> {
        let mut chunk = [0u8; 4096];
        let read = match self.stream.read(&mut chunk) {
            Ok(0) => {
                self.state = SocketState::Closed;
                kill("peer closed the websocket");
                return Ok(0);
            }
            Ok(read) => read,
            Err(err) if would_block(&err) => return Ok(0),
            Err(err) => {
                kill("websocket receive failed");
                return Err(err.into());
            }
        };

        let messages = self.decoder.push(&chunk[..read])?;
        let mut delivered = 0;
        for message in messages {
            if self.handle(message)? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Returns whether the message reached user callbacks.
    fn handle(&mut self, message: Message) -> Result<bool, WsError> {
        match message.opcode {
            Opcode::Ping => {
                // Answered in kind, never surfaced to user callbacks.
                debug!(len = message.payload.len(), "answering ping");
                let pong = encode_frame(Opcode::Pong, &message.payload, true, self.masked);
                self.write_or_buffer(&pong)?;
                Ok(false)
            }
            Opcode::Close => {
                self.state = match self.state {
                    SocketState::CloseSent => SocketState::Closed,
                    _ => SocketState::CloseReceived,
                };
                kill("close frame received");
                self.dispatch(&message);
                Ok(true)
            }
            _ => {
                self.dispatch(&message);
                Ok(true)
            }
        }
    }

    fn dispatch(&mut self, message: &Message) {
        let specific = match message.opcode {
            Opcode::Text => self.on_text.as_mut(),
            Opcode::Binary => self.on_binary.as_mut(),
            Opcode::Close => self.on_close.as_mut(),
            _ => None,
        };

        let mut propagate = true;
        if let Some(callback) = specific {
            propagate = callback(message);
        }
        if propagate {
            if let Some(callback) = self.on_message.as_mut() {
                callback(message);
            }
        }
    }

    fn write_or_buffer(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        if !self.leftover.is_empty() {
            self.leftover.append(bytes);
            return Ok(0);
        }

        let written = self.write_available(bytes)?;
        if written < bytes.len() {
            self.leftover.append(&bytes[written..]);
        }
        Ok(written)
    }

    fn write_available(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        let mut written = 0;
        while written < bytes.len() {
            match self.stream.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(count) => written += count,
                Err(err) if would_block(&err) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(written)
    }
}

fn would_block(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
