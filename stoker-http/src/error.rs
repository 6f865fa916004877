use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid percent escape at offset {0}")]
    InvalidEscape(usize),
    #[error("decoded bytes are not valid utf-8")]
    InvalidUtf8,
    #[error("cookie has no name and cannot be sent")]
    InvalidCookie,
}
