mod buffer;
mod cookie;
mod date;
mod encode;
mod error;
mod mime;
mod multipart;
mod parser;
mod response;
mod status;
mod types;
mod uri;

pub use buffer::ByteBuffer;
pub use cookie::{Cookie, SameSite};
pub use date::{http_date, http_date_in};
pub use encode::{form_decode, url_decode, url_encode};
pub use error::HttpError;
pub use mime::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use multipart::{parse_multipart, MultipartError};
pub use parser::{parse_request, HttpLimits};
pub use response::Output;
pub use status::status_phrase;
pub use types::{FormContent, FormData, HttpVersion, Method, ParsingStatus, Request};
pub use uri::normalize_path;
