use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Head,
    Put,
    Delete,
    Connect,
    Options,
    Patch,
    Trace,
    #[default]
    Unknown,
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "HEAD" => Self::Head,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "CONNECT" => Self::Connect,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "TRACE" => Self::Trace,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsingStatus {
    #[default]
    Ok,
    MaxUploadSizeExceeded,
    InvalidBody,
    InvalidRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormContent {
    Inline(Vec<u8>),
    File { filename: String, path: PathBuf },
}

/// One decoded part of a `multipart/form-data` body. Uploads with a declared
/// filename are spilled to a temp file owned by the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormData {
    pub name: String,
    pub content_type: String,
    pub content: FormContent,
}

impl FormData {
    pub fn is_file(&self) -> bool {
        matches!(self.content, FormContent::File { .. })
    }

    pub fn data(&self) -> Option<&[u8]> {
        match &self.content {
            FormContent::Inline(data) => Some(data),
            FormContent::File { .. } => None,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match &self.content {
            FormContent::File { filename, .. } => Some(filename),
            FormContent::Inline(_) => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            FormContent::File { path, .. } => Some(path),
            FormContent::Inline(_) => None,
        }
    }
}

/// A parsed inbound request. Owned by the worker and reused across
/// iterations; `clear` resets every field and unlinks spilled uploads.
#[derive(Debug, Default)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub raw_query: String,
    pub raw_headers: String,
    pub raw_request_line: String,
    pub version: HttpVersion,
    pub host: String,
    pub worker: u32,
    pub user: String,
    pub password: String,
    pub header: HashMap<String, String>,
    pub cookie: HashMap<String, String>,
    pub get: HashMap<String, String>,
    pub post: HashMap<String, String>,
    pub form: HashMap<String, FormData>,
    pub body: Vec<u8>,
    pub body_content_type: String,
    pub route: Vec<String>,
    pub parsing_status: ParsingStatus,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        remove_spill_files(&self.form);

        self.method = Method::Unknown;
        self.uri.clear();
        self.raw_query.clear();
        self.raw_headers.clear();
        self.raw_request_line.clear();
        self.version = HttpVersion::default();
        self.host.clear();
        self.worker = 0;
        self.user.clear();
        self.password.clear();
        self.header.clear();
        self.cookie.clear();
        self.get.clear();
        self.post.clear();
        self.form.clear();
        self.body.clear();
        self.body_content_type.clear();
        self.route.clear();
        self.parsing_status = ParsingStatus::Ok;
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        remove_spill_files(&self.form);
    }
}

pub(crate) fn remove_spill_files(form: &HashMap<String, FormData>) {
    for part in form.values() {
        if let FormContent::File { path, .. } = &part.content {
            let _ = std::fs::remove_file(path);
        }
    }
}
