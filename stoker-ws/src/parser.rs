use crate::types::{Message, Opcode, WsError};

/// Incremental RFC 6455 frame decoder. Bytes accumulate in `to_parse`; each
/// `push` peels as many complete frames as the buffer holds. Fragmented
/// payloads collect in `parsed_data` and keep the first frame's opcode.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    to_parse: Vec<u8>,
    parsed_data: Vec<u8>,
    fragment_opcode: Option<Opcode>,
}

enum Peel {
    NeedMore,
    Consumed(Option<Message>),
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<Message>, WsError> {
        self.to_parse.extend_from_slice(bytes);

        let mut messages = Vec::new();
        loop {
            match self.peel()? {
                Peel::NeedMore => break,
                Peel::Consumed(Some(message)) => messages.push(message),
                Peel::Consumed(None) => {}
            }
        }
        Ok(messages)
    }

    pub fn buffered(&self) -> usize {
        self.to_parse.len()
    }

    fn peel(&mut self) -> Result<Peel, WsError> {
        let buf = &self.to_parse;
        if buf.len() < 2 {
            return Ok(Peel::NeedMore);
        }

        let fin = buf[0] & 0x80 != 0;
        let opcode_bits = buf[0] & 0x0F;
        let masked = buf[1] & 0x80 != 0;

        let mut offset = 2;
        let payload_len = match buf[1] & 0x7F {
            126 => {
                if buf.len() < offset + 2 {
                    return Ok(Peel::NeedMore);
                }
                let length = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as u64;
                offset += 2;
                length
            }
            127 => {
                if buf.len() < offset + 8 {
                    return Ok(Peel::NeedMore);
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&buf[offset..offset + 8]);
                offset += 8;
                u64::from_be_bytes(raw)
            }
            short => short as u64,
        } as usize;

        let mask = if masked {
            if buf.len() < offset + 4 {
                return Ok(Peel::NeedMore);
            }
            let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
            offset += 4;
            Some(key)
        } else {
            None
        };

        if buf.len() < offset + payload_len {
            return Ok(Peel::NeedMore);
        }

        let opcode =
            Opcode::from_bits(opcode_bits).ok_or(WsError::InvalidOpcode(opcode_bits))?;

        let mut payload = self.to_parse[offset..offset + payload_len].to_vec();
        self.to_parse.drain(..offset + payload_len);
        if let Some(key) = mask {
            for (index, byte) in payload.iter_mut().enumerate() {
                *byte ^= key[index % 4];
            }
        }

        if opcode.is_control() {
            if !fin {
                return Err(WsError::FragmentedControl);
            }
            return Ok(Peel::Consumed(Some(Message { opcode, payload })));
        }

        if opcode == Opcode::Continuation {
            if self.fragment_opcode.is_none() {
                return Err(WsError::StrayContinuation);
            }
        } else {
            self.fragment_opcode = Some(opcode);
            self.parsed_data.clear();
        }
        self.parsed_data.extend_from_slice(&payload);

        if fin {
            let opcode = self.fragment_opcode.take().unwrap_or(opcode);
            let payload = std::mem::take(&mut self.parsed_data);
            Ok(Peel::Consumed(Some(Message { opcode, payload })))
        } else {
            Ok(Peel::Consumed(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::FrameDecoder;
    use crate::encoder::encode_frame;
    use crate::types::{Opcode, WsError};

    #[test]
    fn short_input_needs_more() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&[0x81]).unwrap().is_empty());
        assert_eq!(decoder.buffered(), 1);
    }

    #[test]
    fn invalid_opcode_is_an_error() {
        let mut decoder = FrameDecoder::new();
        assert_matches!(
            decoder.push(&[0x83, 0x00]),
            Err(WsError::InvalidOpcode(0x3))
        );
    }

    #[test]
    fn fragmented_control_frame_is_an_error() {
        let mut decoder = FrameDecoder::new();
        let frame = encode_frame(Opcode::Ping, b"x", false, false);
        assert_matches!(decoder.push(&frame), Err(WsError::FragmentedControl));
    }

    #[test]
    fn stray_continuation_is_an_error() {
        let mut decoder = FrameDecoder::new();
        let frame = encode_frame(Opcode::Continuation, b"x", true, false);
        assert_matches!(decoder.push(&frame), Err(WsError::StrayContinuation));
    }
}
