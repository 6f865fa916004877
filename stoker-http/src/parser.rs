use base64::Engine;
use tracing::debug;

use crate::encode::{form_decode, url_decode};
use crate::error::HttpError;
use crate::multipart::parse_multipart;
use crate::types::{remove_spill_files, HttpVersion, Method, ParsingStatus, Request};
use crate::uri::normalize_path;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    pub max_upload_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Parse one complete daemon-framed HTTP message into `request`.
///
/// The outcome lands in `request.parsing_status`; the return value is the
/// keep-alive decision, which holds even for rejected requests so the error
/// response can honor it.
pub fn parse_request(raw: &[u8], request: &mut Request, limits: &HttpLimits) -> bool {
    request.worker = std::process::id();

    let Some(header_end) = twoway::find_bytes(raw, HEADER_TERMINATOR) else {
        request.parsing_status = ParsingStatus::InvalidRequest;
        return false;
    };
    let Ok(head) = std::str::from_utf8(&raw[..header_end]) else {
        request.parsing_status = ParsingStatus::InvalidRequest;
        return false;
    };

    let request_line = head.split("\r\n").next().unwrap_or("");
    request.raw_request_line = request_line.to_string();

    let mut parts = request_line.split_whitespace();
    let (Some(method_raw), Some(target), Some(version_raw)) =
        (parts.next(), parts.next(), parts.next())
    else {
        request.parsing_status = ParsingStatus::InvalidRequest;
        return false;
    };
    if parts.next().is_some() {
        request.parsing_status = ParsingStatus::InvalidRequest;
        return false;
    }

    request.version = match version_raw {
        "HTTP/1.0" => HttpVersion::Http10,
        "HTTP/1.1" => HttpVersion::Http11,
        _ => {
            request.parsing_status = ParsingStatus::InvalidRequest;
            return false;
        }
    };

    let header_section = head
        .get(request_line.len() + 2..)
        .unwrap_or("");
    request.raw_headers = header_section.to_string();

    for line in header_section.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            request.parsing_status = ParsingStatus::InvalidRequest;
            return false;
        };
        // First occurrence wins; duplicates are ignored.
        request
            .header
            .entry(name.trim().to_ascii_lowercase())
            .or_insert_with(|| value.trim().to_string());
    }

    let keep_alive = match request.version {
        HttpVersion::Http10 => false,
        HttpVersion::Http11 => request
            .header
            .get("connection")
            .map(|value| value.eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(true),
    };

    request.method = Method::parse(method_raw);
    if request.method == Method::Unknown {
        debug!(method = method_raw, "rejecting unknown method");
        request.parsing_status = ParsingStatus::InvalidRequest;
        return false;
    }

    if let Some(raw_length) = request.header.get("content-length") {
        let Ok(length) = raw_length.parse::<usize>() else {
            request.parsing_status = ParsingStatus::InvalidRequest;
            return keep_alive;
        };
        if length > limits.max_upload_bytes {
            request.parsing_status = ParsingStatus::MaxUploadSizeExceeded;
            return keep_alive;
        }
        let body_start = header_end + HEADER_TERMINATOR.len();
        if length > 0 {
            // Surplus framed bytes are ignored; a shortage is a framing bug.
            if raw.len() < body_start + length {
                request.parsing_status = ParsingStatus::InvalidRequest;
                return keep_alive;
            }
            request.body = raw[body_start..body_start + length].to_vec();
        }
    }

    let (path_raw, query_raw) = split_target(target);
    request.raw_query = query_raw.to_string();
    request.uri = normalize_path(path_raw);

    if !query_raw.is_empty() && parse_pairs(query_raw, &mut request.get).is_err() {
        request.parsing_status = ParsingStatus::InvalidRequest;
        return keep_alive;
    }

    if let Some(host) = request.header.get("host") {
        request.host = host.clone();
    }

    if !decode_body(request) {
        return keep_alive;
    }
    decode_cookies(request);
    decode_basic_auth(request);

    keep_alive
}

/// Split a request target into path and raw query. A `#` aborts the scan;
/// the fragment is dropped.
fn split_target(target: &str) -> (&str, &str) {
    let mut query_start = None;
    let mut end = target.len();

    for (index, byte) in target.bytes().enumerate() {
        match byte {
            b'?' if query_start.is_none() => query_start = Some(index),
            b'#' => {
                end = index;
                break;
            }
            _ => {}
        }
    }

    match query_start {
        Some(query_start) => (&target[..query_start], &target[query_start + 1..end]),
        None => (&target[..end], ""),
    }
}

fn parse_pairs(
    input: &str,
    map: &mut std::collections::HashMap<String, String>,
) -> Result<(), HttpError> {
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.insert(form_decode(key)?, form_decode(value)?);
    }
    Ok(())
}

fn decode_body(request: &mut Request) -> bool {
    let content_type = request
        .header
        .get("content-type")
        .cloned()
        .unwrap_or_default();
    request.body_content_type = content_type.clone();

    if request.body.is_empty() {
        return true;
    }

    let token = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match token.as_str() {
        "application/x-www-form-urlencoded" => {
            let decoded = std::str::from_utf8(&request.body)
                .map_err(|_| HttpError::InvalidUtf8)
                .and_then(|text| parse_pairs(text, &mut request.post));
            if decoded.is_err() {
                request.post.clear();
                request.parsing_status = ParsingStatus::InvalidBody;
                return false;
            }
        }
        "multipart/form-data" => {
            if let Err(err) = parse_multipart(&request.body, &content_type, &mut request.form) {
                debug!(%err, "discarding multipart body");
                remove_spill_files(&request.form);
                request.form.clear();
                request.parsing_status = ParsingStatus::InvalidBody;
                return false;
            }
        }
        _ => {}
    }
    true
}

fn decode_cookies(request: &mut Request) {
    let Some(raw) = request.header.get("cookie") else {
        return;
    };
    for pair in raw.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        let (Ok(name), Ok(value)) = (url_decode(name), url_decode(value)) else {
            continue;
        };
        request.cookie.insert(name, value);
    }
}

fn decode_basic_auth(request: &mut Request) {
    let Some(authorization) = request.header.get("authorization") else {
        return;
    };
    let trimmed = authorization.trim();
    if trimmed.len() < 6 || !trimmed[..6].eq_ignore_ascii_case("basic ") {
        return;
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(trimmed[6..].trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    match decoded {
        Some(credentials) => {
            let (user, password) = credentials
                .split_once(':')
                .unwrap_or((credentials.as_str(), ""));
            request.user = user.to_string();
            request.password = password.to_string();
        }
        None => {
            request.user.clear();
            request.password.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::split_target;

    #[test]
    fn splits_path_and_query() {
        assert_eq!(split_target("/a?x=1"), ("/a", "x=1"));
        assert_eq!(split_target("/a"), ("/a", ""));
    }

    #[test]
    fn fragment_aborts_the_scan() {
        assert_eq!(split_target("/a?x=1#frag"), ("/a", "x=1"));
        assert_eq!(split_target("/a#frag?x=1"), ("/a", ""));
    }
}
