use spindle::http::response::{Response, ResponseBuilder, StatusCode};

#[test]
fn test_status_codes_map_both_ways() {
    for code in [101, 200, 201, 204, 400, 404, 405, 500, 502, 503, 504] {
        let status = StatusCode::from_u16(code);
        assert!(!matches!(status, StatusCode::Other(_)), "{} unmapped", code);
        assert_eq!(status.as_u16(), code);
    }

    assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
    assert_eq!(StatusCode::Other(418).as_u16(), 418);
    assert_eq!(StatusCode::Other(418).reason_phrase(), "Unknown");
    assert_eq!(StatusCode::BadGateway.reason_phrase(), "Bad Gateway");
}

#[test]
fn test_is_ok_means_2xx() {
    assert!(Response::ok(&b""[..]).is_ok());
    assert!(ResponseBuilder::new(StatusCode::NoContent).build().is_ok());
    assert!(!ResponseBuilder::new(StatusCode::SwitchingProtocols).build().is_ok());
    assert!(!Response::not_found().is_ok());
    assert!(!ResponseBuilder::new(StatusCode::BadGateway).build().is_ok());
    assert!(!ResponseBuilder::new(StatusCode::Other(302)).build().is_ok());
}

#[test]
fn test_header_lookup_ignores_case() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .build();

    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert_eq!(response.header("CONTENT-LENGTH"), Some("0"));
    assert_eq!(response.header("x-missing"), None);
}

#[test]
fn test_content_length_follows_body_unless_set() {
    let sized = Response::ok(&b"four"[..]);
    assert_eq!(sized.header("Content-Length"), Some("4"));

    let explicit = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(&b"four"[..])
        .build();
    assert_eq!(explicit.header("Content-Length"), Some("999"));
}

#[test]
fn test_canned_error_responses_are_plain_text() {
    for (response, status) in [
        (Response::not_found(), StatusCode::NotFound),
        (Response::bad_request(), StatusCode::BadRequest),
        (Response::internal_error(), StatusCode::InternalServerError),
    ] {
        assert_eq!(response.status, status);
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert!(response.body.starts_with(status.as_u16().to_string().as_bytes()));
    }
}
