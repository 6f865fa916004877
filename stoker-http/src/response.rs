use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::buffer::ByteBuffer;
use crate::cookie::Cookie;
use crate::date::http_date_in;
use crate::error::HttpError;
use crate::mime;
use crate::status::status_phrase;
use crate::types::HttpVersion;

const RESERVED_HEADERS: [&str; 3] = ["content-length", "status", "transfer-encoding"];
const DEFAULT_BODY_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// The response under construction. Owned by the worker and reused across
/// iterations; buffers keep their allocation over `clear`.
#[derive(Debug)]
pub struct Output {
    status: u16,
    pub version: HttpVersion,
    pub keep_alive: bool,
    pub send_body: bool,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    dirty: bool,
    headers_buf: ByteBuffer,
    send_buf: ByteBuffer,
    timeout: Option<Duration>,
    timeout_sink: Option<Arc<AtomicU64>>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            status: 200,
            version: HttpVersion::default(),
            keep_alive: true,
            send_body: true,
            headers: Vec::new(),
            cookies: Vec::new(),
            dirty: false,
            headers_buf: ByteBuffer::new(),
            send_buf: ByteBuffer::new(),
            timeout: None,
            timeout_sink: None,
        }
    }

    pub fn clear(&mut self) {
        self.status = 200;
        self.version = HttpVersion::default();
        self.keep_alive = true;
        self.send_body = true;
        self.headers.clear();
        self.cookies.clear();
        self.dirty = false;
        self.headers_buf.clear();
        self.send_buf.clear();
        self.timeout = None;
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, code: u16) {
        self.status = code;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.send_buf.append(bytes);
        self.dirty = true;
    }

    pub fn write_str(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Add a user header. Keys are lowercased; reserved keys are refused.
    pub fn add_header(&mut self, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        if RESERVED_HEADERS.contains(&key.as_str()) {
            warn!(header = %key, "ignoring reserved header");
            return;
        }
        self.headers.push((key, value.to_string()));
        self.dirty = true;
    }

    /// Add a header whose value is the absolute HTTP-date `delta` from now.
    pub fn add_header_in(&mut self, key: &str, delta: Duration) {
        let value = http_date_in(delta);
        self.add_header(key, &value);
    }

    pub fn set_cookie(&mut self, cookie: Cookie) -> Result<(), HttpError> {
        if !cookie.is_valid() {
            return Err(HttpError::InvalidCookie);
        }
        self.cookies.push(cookie);
        self.dirty = true;
        Ok(())
    }

    /// Per-request watchdog override. Written through to the shared sink the
    /// worker installs, so the watchdog sees it while the handler runs.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
        if let Some(sink) = &self.timeout_sink {
            sink.store(timeout.as_millis() as u64, Ordering::Release);
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout_sink(&mut self, sink: Arc<AtomicU64>) {
        self.timeout_sink = Some(sink);
    }

    /// Serve a regular file: content type from the extension map, bytes
    /// appended to the body. Returns false without touching the buffer when
    /// the file is missing or not regular.
    pub fn serve_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                warn!(path = %path.display(), "cannot serve missing or non-regular file");
                return false;
            }
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), %err, "cannot read served file");
                return false;
            }
        };

        let content_type = path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(mime::content_type_for)
            .unwrap_or(mime::DEFAULT_CONTENT_TYPE);
        if !self.has_header("content-type") {
            self.add_header("content-type", content_type);
        }

        self.send_buf.reserve(metadata.len() as usize);
        self.write(&bytes);
        true
    }

    /// Emit the status line and all headers into the headers buffer. When the
    /// body is suppressed the send buffer is cleared afterwards.
    pub fn build_headers(&mut self) {
        self.headers_buf.clear();

        let mut head = String::with_capacity(256);
        let _ = write!(
            head,
            "{} {} {}\r\n",
            self.version.as_str(),
            self.status,
            status_phrase(self.status)
        );
        let _ = write!(
            head,
            "connection: {}\r\n",
            if self.keep_alive { "keep-alive" } else { "close" }
        );

        let content_length = if self.send_body { self.send_buf.len() } else { 0 };
        let _ = write!(head, "content-length: {content_length}\r\n");

        for (key, value) in &self.headers {
            if !self.send_body && (key == "content-length" || key == "transfer-encoding") {
                continue;
            }
            let _ = write!(head, "{key}: {value}\r\n");
        }

        if self.send_body && !self.send_buf.is_empty() && !self.has_header("content-type") {
            let _ = write!(head, "content-type: {DEFAULT_BODY_CONTENT_TYPE}\r\n");
        }

        for cookie in &self.cookies {
            let _ = write!(head, "set-cookie: {}\r\n", cookie.header_value());
        }

        head.push_str("\r\n");
        self.headers_buf.append(head.as_bytes());

        if !self.send_body {
            self.send_buf.clear();
        }
    }

    pub fn headers_bytes(&self) -> &[u8] {
        self.headers_buf.as_slice()
    }

    pub fn body_bytes(&self) -> &[u8] {
        self.send_buf.as_slice()
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(key, _)| key == name)
    }
}
