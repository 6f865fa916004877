use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

use crate::types::{FormContent, FormData};

static UPLOAD_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MultipartError {
    #[error("multipart body without a boundary")]
    MissingBoundary,
    #[error("multipart chunk is not CRLF-delimited")]
    MalformedChunk,
    #[error("multipart trailer is missing or truncated")]
    TruncatedTrailer,
    #[error("multipart chunk has no content-disposition name")]
    MissingName,
    #[error("cannot spill upload to disk: {0}")]
    Spill(String),
}

/// Decode a `multipart/form-data` body into `form`. Parts that declare a
/// filename are spilled to the OS temp dir under
/// `upload_<unix-seconds>_<pid>_<counter><ext>`; the caller owns cleanup of
/// anything inserted before an error.
pub fn parse_multipart(
    body: &[u8],
    content_type: &str,
    form: &mut HashMap<String, FormData>,
) -> Result<(), MultipartError> {
    let boundary = boundary_from_params(content_type)
        .or_else(|| sniff_boundary(body))
        .ok_or(MultipartError::MissingBoundary)?;
    let delimiter = format!("--{boundary}");

    let pieces = split_on(body, delimiter.as_bytes());
    if pieces.len() < 2 {
        return Err(MultipartError::TruncatedTrailer);
    }
    let trailer = pieces[pieces.len() - 1];
    if !trailer.starts_with(b"--") {
        return Err(MultipartError::TruncatedTrailer);
    }

    for chunk in &pieces[1..pieces.len() - 1] {
        let chunk = chunk
            .strip_prefix(b"\r\n")
            .and_then(|chunk| chunk.strip_suffix(b"\r\n"))
            .ok_or(MultipartError::MalformedChunk)?;
        parse_chunk(chunk, form)?;
    }

    Ok(())
}

fn parse_chunk(chunk: &[u8], form: &mut HashMap<String, FormData>) -> Result<(), MultipartError> {
    let (header_bytes, data) = if let Some(rest) = chunk.strip_prefix(b"\r\n") {
        (&[][..], rest)
    } else {
        match twoway::find_bytes(chunk, b"\r\n\r\n") {
            Some(index) => (&chunk[..index], &chunk[index + 4..]),
            None => return Err(MultipartError::MalformedChunk),
        }
    };

    let headers =
        std::str::from_utf8(header_bytes).map_err(|_| MultipartError::MalformedChunk)?;

    let mut name = None;
    let mut filename = None;
    let mut content_type = "text/plain".to_string();

    for line in headers.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        match header.trim().to_ascii_lowercase().as_str() {
            "content-disposition" => {
                name = disposition_param(value, "name");
                filename = disposition_param(value, "filename");
            }
            "content-type" => content_type = value.trim().to_string(),
            _ => {}
        }
    }

    let name = name.ok_or(MultipartError::MissingName)?;

    let content = match filename {
        Some(filename) => {
            let path = spill(data, &filename)?;
            debug!(field = %name, file = %path.display(), "spilled multipart upload");
            FormContent::File { filename, path }
        }
        None => FormContent::Inline(data.to_vec()),
    };

    form.insert(
        name.clone(),
        FormData {
            name,
            content_type,
            content,
        },
    );
    Ok(())
}

fn spill(data: &[u8], filename: &str) -> Result<std::path::PathBuf, MultipartError> {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let counter = UPLOAD_ID.fetch_add(1, Ordering::Relaxed) % 100_000;
    let extension = filename
        .rfind('.')
        .map(|index| &filename[index..])
        .unwrap_or("");
    let path = std::env::temp_dir().join(format!(
        "upload_{unix}_{pid}_{counter:05}{extension}",
        pid = std::process::id()
    ));

    std::fs::write(&path, data).map_err(|err| MultipartError::Spill(err.to_string()))?;
    Ok(path)
}

/// A parameter from a `content-disposition` value, e.g. `name` out of
/// `form-data; name="f"; filename="a.txt"`. Values may be quoted or bare.
fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    for param in disposition.split(';') {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(key) {
            return Some(value.trim().trim_matches('"').to_string());
        }
    }
    None
}

fn boundary_from_params(content_type: &str) -> Option<String> {
    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            return Some(value.trim().trim_matches('"').to_string());
        }
    }
    None
}

fn sniff_boundary(body: &[u8]) -> Option<String> {
    for line in std::str::from_utf8(body).ok()?.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        return line.strip_prefix("--").map(|raw| raw.to_string());
    }
    None
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = twoway::find_bytes(&haystack[cursor..], needle) {
        pieces.push(&haystack[cursor..cursor + offset]);
        cursor += offset + needle.len();
    }
    pieces.push(&haystack[cursor..]);
    pieces
}
