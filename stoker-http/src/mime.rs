pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type for a file extension, used by `Output::serve_file`.
pub fn content_type_for(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::content_type_for;

    #[test]
    fn known_extensions_map() {
        assert_eq!(content_type_for("html"), Some("text/html"));
        assert_eq!(content_type_for("PNG"), Some("image/png"));
        assert_eq!(content_type_for("woff2"), Some("font/woff2"));
    }

    #[test]
    fn unknown_extensions_are_none() {
        assert_eq!(content_type_for("xyz"), None);
    }
}
