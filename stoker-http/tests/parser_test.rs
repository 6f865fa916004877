use stoker_http::{parse_request, HttpLimits, HttpVersion, Method, ParsingStatus, Request};

fn parse(raw: &[u8]) -> (Request, bool) {
    let mut request = Request::new();
    let keep_alive = parse_request(raw, &mut request, &HttpLimits::default());
    (request, keep_alive)
}

#[test]
fn simple_get_with_query() {
    let (request, keep_alive) = parse(b"GET /hello?x=1 HTTP/1.1\r\nHost: a\r\n\r\n");

    assert_eq!(request.parsing_status, ParsingStatus::Ok);
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.version, HttpVersion::Http11);
    assert_eq!(request.uri, "/hello");
    assert_eq!(request.raw_query, "x=1");
    assert_eq!(request.get["x"], "1");
    assert_eq!(request.host, "a");
    assert!(keep_alive);
}

#[test]
fn traversal_cannot_escape_root() {
    let (request, keep_alive) = parse(b"GET /a/../../etc/passwd HTTP/1.0\r\n\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::Ok);
    assert_eq!(request.uri, "/etc/passwd");
    assert!(!keep_alive);

    let (request, _) = parse(b"GET /a/b/../../../x HTTP/1.1\r\n\r\n");
    assert_eq!(request.uri, "/x");
}

#[test]
fn uri_always_starts_with_slash() {
    for target in ["/..", "/../..", "/a/..", "/."] {
        let raw = format!("GET {target} HTTP/1.1\r\n\r\n");
        let (request, _) = parse(raw.as_bytes());
        assert_eq!(request.uri, "/", "target {target}");
    }
}

#[test]
fn header_names_are_lowercased() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\nX-Custom-Header: Foo\r\nHOST: a\r\n\r\n");
    assert_eq!(request.header["x-custom-header"], "Foo");
    assert_eq!(request.header["host"], "a");
    assert_eq!(request.host, "a");
}

#[test]
fn keep_alive_decisions() {
    let (_, keep_alive) = parse(b"GET / HTTP/1.1\r\n\r\n");
    assert!(keep_alive);

    let (_, keep_alive) = parse(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
    assert!(!keep_alive);

    let (_, keep_alive) = parse(b"GET / HTTP/1.1\r\nConnection: Keep-Alive\r\n\r\n");
    assert!(keep_alive);

    let (_, keep_alive) = parse(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");
    assert!(!keep_alive);
}

#[test]
fn unknown_method_is_rejected() {
    let (request, keep_alive) = parse(b"BREW /pot HTTP/1.1\r\n\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::InvalidRequest);
    assert!(!keep_alive);
}

#[test]
fn unknown_version_is_rejected_without_keep_alive() {
    let (request, keep_alive) = parse(b"GET / HTTP/2.0\r\n\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::InvalidRequest);
    assert!(!keep_alive);
}

#[test]
fn missing_header_terminator_is_rejected() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\nHost: a\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::InvalidRequest);
}

#[test]
fn malformed_header_line_is_rejected() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\nnot-a-header\r\n\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::InvalidRequest);
}

#[test]
fn bad_percent_escape_fails_the_request() {
    let (request, _) = parse(b"GET /x?a=%zz HTTP/1.1\r\n\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::InvalidRequest);
}

#[test]
fn plus_decodes_to_space() {
    let (request, _) = parse(b"GET /?q=a+b&r=c%20d HTTP/1.1\r\n\r\n");
    assert_eq!(request.get["q"], "a b");
    assert_eq!(request.get["r"], "c d");
}

#[test]
fn fragment_is_dropped() {
    let (request, _) = parse(b"GET /page?x=1#section HTTP/1.1\r\n\r\n");
    assert_eq!(request.uri, "/page");
    assert_eq!(request.get["x"], "1");
}

#[test]
fn urlencoded_body_fills_post() {
    let body = "name=stoker&kind=worker+pool";
    let raw = format!(
        "POST /submit HTTP/1.1\r\nHost: a\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let (request, _) = parse(raw.as_bytes());

    assert_eq!(request.parsing_status, ParsingStatus::Ok);
    assert_eq!(request.post["name"], "stoker");
    assert_eq!(request.post["kind"], "worker pool");
    assert_eq!(request.body, body.as_bytes());
}

#[test]
fn first_content_length_wins() {
    let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 999\r\n\r\nhelloEXTRA";
    let (request, _) = parse(raw);
    assert_eq!(request.parsing_status, ParsingStatus::Ok);
    assert_eq!(request.body, b"hello");
}

#[test]
fn oversized_body_is_rejected_before_decoding() {
    let mut request = Request::new();
    let limits = HttpLimits {
        max_upload_bytes: 4,
    };
    let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
    parse_request(raw, &mut request, &limits);
    assert_eq!(request.parsing_status, ParsingStatus::MaxUploadSizeExceeded);
    assert!(request.body.is_empty());
}

#[test]
fn multipart_upload_spills_to_disk() {
    let body = "--XYZ\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nHELLO\r\n--XYZ--\r\n";
    let raw = format!(
        "POST /u HTTP/1.1\r\nHost: a\r\nContent-Type: multipart/form-data; boundary=XYZ\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let mut request = Request::new();
    parse_request(raw.as_bytes(), &mut request, &HttpLimits::default());

    assert_eq!(request.parsing_status, ParsingStatus::Ok);
    let upload = &request.form["f"];
    assert!(upload.is_file());
    assert_eq!(upload.filename(), Some("a.txt"));

    let path = upload.path().unwrap().to_path_buf();
    assert!(path.exists());
    assert_eq!(std::fs::read(&path).unwrap(), b"HELLO");

    request.clear();
    assert!(!path.exists());
}

#[test]
fn truncated_multipart_is_invalid_body() {
    let body = "--XYZ\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\ndata\r\n";
    let raw = format!(
        "POST /u HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=XYZ\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let (request, _) = parse(raw.as_bytes());

    assert_eq!(request.parsing_status, ParsingStatus::InvalidBody);
    assert!(request.form.is_empty());
}

#[test]
fn cookies_are_decoded() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\nCookie: session=abc; theme=dark%20mode\r\n\r\n");
    assert_eq!(request.cookie["session"], "abc");
    assert_eq!(request.cookie["theme"], "dark mode");
}

#[test]
fn basic_auth_is_decoded() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\nAuthorization: Basic dXNlcjpwYXNz\r\n\r\n");
    assert_eq!(request.user, "user");
    assert_eq!(request.password, "pass");
}

#[test]
fn broken_basic_auth_is_ignored() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\nAuthorization: Basic !!!notbase64\r\n\r\n");
    assert_eq!(request.parsing_status, ParsingStatus::Ok);
    assert!(request.user.is_empty());
    assert!(request.password.is_empty());
}

#[test]
fn worker_field_carries_the_pid() {
    let (request, _) = parse(b"GET / HTTP/1.1\r\n\r\n");
    assert_eq!(request.worker, std::process::id());
}

#[test]
fn raw_request_line_is_preserved() {
    let (request, _) = parse(b"GET /hello?x=1 HTTP/1.1\r\nHost: a\r\n\r\n");
    assert_eq!(request.raw_request_line, "GET /hello?x=1 HTTP/1.1");
    assert!(request.raw_headers.starts_with("Host: a"));
}
