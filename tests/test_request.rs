use bytes::Bytes;
use spindle::http::request::{Method, Request, RequestBuilder};
use std::collections::HashMap;

#[test]
fn test_request_header_retrieval() {
    let mut headers = HashMap::new();
    headers.insert("Host".to_string(), "example.com".to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Bytes::new(),
    };

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length_parsing() {
    let mut headers = HashMap::new();
    headers.insert("Content-Length".to_string(), "42".to_string());

    let req = Request {
        method: Method::POST,
        target: "/api".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Bytes::new(),
    };

    assert_eq!(req.content_length(), 42);
}

#[test]
fn test_request_content_length_missing() {
    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        body: Bytes::new(),
    };

    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_request_content_length_invalid() {
    let mut headers = HashMap::new();
    headers.insert("Content-Length".to_string(), "not-a-number".to_string());

    let req = Request {
        method: Method::POST,
        target: "/api".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Bytes::new(),
    };

    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_request_keep_alive_http11_default() {
    // HTTP/1.1 defaults to keep-alive
    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        body: Bytes::new(),
    };

    assert!(req.keep_alive());
}

#[test]
fn test_request_keep_alive_explicit_header() {
    let mut headers = HashMap::new();
    headers.insert("Connection".to_string(), "keep-alive".to_string());

    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Bytes::new(),
    };

    assert!(req.keep_alive());
}

#[test]
fn test_request_keep_alive_close() {
    let mut headers = HashMap::new();
    headers.insert("Connection".to_string(), "close".to_string());

    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Bytes::new(),
    };

    assert!(!req.keep_alive());
}

#[test]
fn test_request_keep_alive_case_insensitive() {
    let mut headers = HashMap::new();
    headers.insert("Connection".to_string(), "Keep-Alive".to_string());

    let req = Request {
        method: Method::GET,
        target: "/".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: Bytes::new(),
    };

    assert!(req.keep_alive());
}

#[test]
fn test_request_method_equality() {
    assert_eq!(Method::GET, Method::GET);
    assert_ne!(Method::GET, Method::POST);
}

#[test]
fn test_request_method_from_string() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("INVALID"), None);
    assert_eq!(Method::from_str("get"), None); // Case-sensitive
}

#[test]
fn test_request_with_body() {
    let body_content = Bytes::from_static(b"test body content");
    let req = Request {
        method: Method::POST,
        target: "/api".to_string(),
        version: "HTTP/1.1".to_string(),
        headers: HashMap::new(),
        body: body_content.clone(),
    };

    assert_eq!(req.body, body_content);
}

#[test]
fn test_request_header_case_insensitive() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/")
        .header("content-length", "7")
        .build()
        .unwrap();

    assert_eq!(req.header("Content-Length"), Some("7"));
    assert_eq!(req.content_length(), 7);
}

#[test]
fn test_request_http10_defaults_to_close() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/")
        .version("HTTP/1.0")
        .build()
        .unwrap();

    assert!(!req.keep_alive());
}

#[test]
fn test_request_upgrade_detection() {
    let plain = RequestBuilder::new()
        .method(Method::GET)
        .target("/chat")
        .build()
        .unwrap();
    let upgrade = RequestBuilder::new()
        .method(Method::GET)
        .target("/chat")
        .header("Upgrade", "websocket")
        .build()
        .unwrap();

    assert!(!plain.is_upgrade());
    assert!(upgrade.is_upgrade());
}

#[test]
fn test_request_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}
