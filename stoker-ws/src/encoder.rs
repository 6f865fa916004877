use crate::types::{Message, Opcode};

/// Encode one frame. Length fields are network byte order; masked frames get
/// a random 4-byte key with the payload XOR-ed in place.
pub fn encode_frame(opcode: Opcode, payload: &[u8], fin: bool, masked: bool) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 14);

    let fin_bit = if fin { 0x80 } else { 0x00 };
    frame.push(fin_bit | opcode.bits());

    let mask_bit = if masked { 0x80 } else { 0x00 };
    if payload.len() < 126 {
        frame.push(mask_bit | payload.len() as u8);
    } else if payload.len() <= u16::MAX as usize {
        frame.push(mask_bit | 126);
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    } else {
        frame.push(mask_bit | 127);
        frame.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    }

    if masked {
        let key: [u8; 4] = rand::random();
        frame.extend_from_slice(&key);
        frame.extend(
            payload
                .iter()
                .enumerate()
                .map(|(index, byte)| byte ^ key[index % 4]),
        );
    } else {
        frame.extend_from_slice(payload);
    }

    frame
}

pub fn encode_message(message: &Message, masked: bool) -> Vec<u8> {
    encode_frame(message.opcode, &message.payload, true, masked)
}
