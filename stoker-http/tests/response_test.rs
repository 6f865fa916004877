use std::time::Duration;

use assert_matches::assert_matches;
use stoker_http::{Cookie, HttpError, Output, SameSite};

fn headers_string(output: &Output) -> String {
    String::from_utf8(output.headers_bytes().to_vec()).unwrap()
}

#[test]
fn simple_ok_response_emission() {
    let mut output = Output::new();
    output.write_str("ok");
    output.build_headers();

    assert_eq!(
        headers_string(&output),
        "HTTP/1.1 200 OK\r\nconnection: keep-alive\r\ncontent-length: 2\r\ncontent-type: text/html;charset=utf-8\r\n\r\n"
    );
    assert_eq!(output.body_bytes(), b"ok");
}

#[test]
fn suppressed_body_reports_zero_length() {
    let mut output = Output::new();
    output.write_str("ignored");
    output.send_body = false;
    output.build_headers();

    let headers = headers_string(&output);
    assert!(headers.contains("content-length: 0\r\n"));
    assert!(!headers.contains("content-type"));
    assert!(output.body_bytes().is_empty());
}

#[test]
fn reserved_headers_are_refused() {
    let mut output = Output::new();
    output.write_str("x");
    output.add_header("Content-Length", "999");
    output.add_header("Transfer-Encoding", "chunked");
    output.add_header("Status", "418");
    output.build_headers();

    let headers = headers_string(&output);
    assert_eq!(headers.matches("content-length:").count(), 1);
    assert!(headers.contains("content-length: 1\r\n"));
    assert!(!headers.contains("transfer-encoding"));
    assert!(!headers.contains("status:"));
}

#[test]
fn user_content_type_suppresses_default() {
    let mut output = Output::new();
    output.write_str("{}");
    output.add_header("Content-Type", "application/json");
    output.build_headers();

    let headers = headers_string(&output);
    assert!(headers.contains("content-type: application/json\r\n"));
    assert!(!headers.contains("text/html"));
}

#[test]
fn close_connection_when_keep_alive_is_off() {
    let mut output = Output::new();
    output.keep_alive = false;
    output.build_headers();
    assert!(headers_string(&output).contains("connection: close\r\n"));
}

#[test]
fn unknown_status_gets_unknown_phrase() {
    let mut output = Output::new();
    output.set_status(299);
    output.build_headers();
    assert!(headers_string(&output).starts_with("HTTP/1.1 299 Unknown\r\n"));
}

#[test]
fn cookies_are_emitted_with_attributes() {
    let mut output = Output::new();
    let mut cookie = Cookie::new("session", "abc");
    cookie.set_max_age(60);
    cookie.path = Some("/".to_string());
    cookie.http_only = true;
    output.set_cookie(cookie).unwrap();
    output.build_headers();

    assert!(headers_string(&output)
        .contains("set-cookie: session=abc; Max-Age=60; path=/; HttpOnly\r\n"));
}

#[test]
fn same_site_none_is_always_secure_on_the_wire() {
    let mut output = Output::new();
    let mut cookie = Cookie::new("a", "b");
    cookie.same_site = SameSite::None;
    output.set_cookie(cookie).unwrap();
    output.build_headers();

    let headers = headers_string(&output);
    let line = headers
        .lines()
        .find(|line| line.starts_with("set-cookie:"))
        .unwrap();
    assert!(line.contains("SameSite=None"));
    assert!(line.contains("Secure"));
}

#[test]
fn invalid_cookie_is_an_explicit_error() {
    let mut output = Output::new();
    assert_matches!(
        output.set_cookie(Cookie::default()),
        Err(HttpError::InvalidCookie)
    );
    assert!(!output.is_dirty());
}

#[test]
fn dirty_tracks_user_visible_mutations() {
    let mut output = Output::new();
    assert!(!output.is_dirty());

    output.set_status(204);
    assert!(output.is_dirty());

    output.clear();
    assert!(!output.is_dirty());
    assert_eq!(output.status(), 200);

    output.write(b"data");
    assert!(output.is_dirty());
}

#[test]
fn serve_file_guesses_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.html");
    std::fs::write(&path, b"<html></html>").unwrap();

    let mut output = Output::new();
    assert!(output.serve_file(&path));
    output.build_headers();

    assert!(headers_string(&output).contains("content-type: text/html\r\n"));
    assert_eq!(output.body_bytes(), b"<html></html>");
}

#[test]
fn serve_file_unknown_extension_is_octet_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blob.xyz");
    std::fs::write(&path, b"\x00\x01").unwrap();

    let mut output = Output::new();
    assert!(output.serve_file(&path));
    output.build_headers();
    assert!(headers_string(&output).contains("content-type: application/octet-stream\r\n"));
}

#[test]
fn serve_file_missing_leaves_buffer_untouched() {
    let mut output = Output::new();
    output.write_str("before");
    assert!(!output.serve_file("/nonexistent/definitely/missing.txt"));
    assert_eq!(output.body_bytes(), b"before");
}

#[test]
fn header_with_duration_is_an_http_date() {
    let mut output = Output::new();
    output.add_header_in("Expires", Duration::from_secs(3600));
    output.build_headers();

    let headers = headers_string(&output);
    let line = headers
        .lines()
        .find(|line| line.starts_with("expires:"))
        .unwrap();
    assert!(line.ends_with("GMT"));
}
