use percent_encoding::{percent_encode, NON_ALPHANUMERIC};

use crate::error::HttpError;

pub fn url_encode(input: &str) -> String {
    percent_encode(input.as_bytes(), NON_ALPHANUMERIC).to_string()
}

/// Strict percent-decoding: a `%` not followed by two hex digits fails the
/// whole input.
pub fn url_decode(input: &str) -> Result<String, HttpError> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%' {
            let high = bytes.get(index + 1).and_then(|byte| (*byte as char).to_digit(16));
            let low = bytes.get(index + 2).and_then(|byte| (*byte as char).to_digit(16));
            match (high, low) {
                (Some(high), Some(low)) => {
                    decoded.push((high * 16 + low) as u8);
                    index += 3;
                }
                _ => return Err(HttpError::InvalidEscape(index)),
            }
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }

    String::from_utf8(decoded).map_err(|_| HttpError::InvalidUtf8)
}

/// Query-component decoding: `+` means space.
pub fn form_decode(input: &str) -> Result<String, HttpError> {
    url_decode(&input.replace('+', " "))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{form_decode, url_decode, url_encode};
    use crate::error::HttpError;

    #[test]
    fn decode_inverts_encode() {
        let input = "caffè latte & <tags>?";
        let encoded = url_encode(input);
        assert_eq!(url_decode(&encoded).unwrap(), input);
    }

    #[test]
    fn plus_means_space_in_forms() {
        assert_eq!(form_decode("a+b%20c").unwrap(), "a b c");
    }

    #[test]
    fn truncated_escape_fails() {
        assert_matches!(url_decode("abc%4"), Err(HttpError::InvalidEscape(3)));
        assert_matches!(url_decode("%zz"), Err(HttpError::InvalidEscape(0)));
    }

    #[test]
    fn invalid_utf8_fails() {
        assert_matches!(url_decode("%ff%fe"), Err(HttpError::InvalidUtf8));
    }
}
