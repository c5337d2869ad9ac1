use spindle::uri::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SCHEME, Uri};

#[test]
fn test_uri_path_only_gets_defaults() {
    let uri = Uri::parse("/foo/bar?x=1&x=2").unwrap();

    assert_eq!(uri.scheme(), DEFAULT_SCHEME);
    assert_eq!(uri.host(), DEFAULT_HOST);
    assert_eq!(uri.port(), DEFAULT_PORT);
    assert_eq!(uri.path(), "/foo/bar");
    assert_eq!(uri.attributes().len(), 2);
}

#[test]
fn test_uri_duplicate_attributes_kept_in_order() {
    let uri = Uri::parse("/foo/bar?x=1&x=2").unwrap();

    let pairs: Vec<(&str, &str)> = uri.attributes().iter().collect();
    assert_eq!(pairs, vec![("x", "1"), ("x", "2")]);
    assert_eq!(uri.attributes().get("x"), Some("1"));
    assert_eq!(uri.attributes().get_all("x").collect::<Vec<_>>(), vec!["1", "2"]);
}

#[test]
fn test_uri_full_form() {
    let uri = Uri::parse("https://example.com:8443/api/v1?debug=true").unwrap();

    assert_eq!(uri.scheme(), "https");
    assert_eq!(uri.host(), "example.com");
    assert_eq!(uri.port(), 8443);
    assert_eq!(uri.path(), "/api/v1");
    assert_eq!(uri.attributes().get("debug"), Some("true"));
}

#[test]
fn test_uri_full_form_without_query() {
    let uri = Uri::parse("http://example.com:9090/a/b").unwrap();

    assert_eq!(uri.scheme(), "http");
    assert_eq!(uri.host(), "example.com");
    assert_eq!(uri.port(), 9090);
    assert_eq!(uri.path(), "/a/b");
    assert!(uri.attributes().is_empty());
}

#[test]
fn test_uri_full_form_defaults_port_and_path() {
    let uri = Uri::parse("http://example.com").unwrap();

    assert_eq!(uri.port(), 80);
    assert_eq!(uri.path(), "/");
    assert!(uri.attributes().is_empty());
}

#[test]
fn test_uri_query_without_path() {
    let uri = Uri::parse("http://example.com?a=b").unwrap();

    assert_eq!(uri.path(), "/");
    assert_eq!(uri.attributes().get("a"), Some("b"));
}

#[test]
fn test_uri_ipv6_host() {
    let uri = Uri::parse("http://[::1]:9000/x").unwrap();

    assert_eq!(uri.host(), "[::1]");
    assert_eq!(uri.port(), 9000);
    assert_eq!(uri.authority(), "[::1]:9000");
}

#[test]
fn test_uri_percent_decoded_attributes() {
    let uri = Uri::parse("/search?q=hello%20world&tag=a+b").unwrap();

    assert_eq!(uri.attributes().get("q"), Some("hello world"));
    assert_eq!(uri.attributes().get("tag"), Some("a b"));
}

#[test]
fn test_uri_slashes_normalized() {
    assert_eq!(Uri::parse("//a///b/").unwrap().path(), "/a/b");
    assert_eq!(Uri::parse("/").unwrap().path(), "/");
    assert_eq!(Uri::parse("http://h//x//").unwrap().path(), "/x");
}

#[test]
fn test_uri_rejects_malformed_input() {
    for input in [
        "",
        "not a uri at all",
        "foo",
        "relative/path",
        "http://",
        "http://:80/",
        "http://host:/x",
        "http://host:abc/",
        "http://host:99999/",
        "1http://host/",
        "/has space",
        "/frag#ment",
        "http://host/x#y",
    ] {
        assert!(Uri::parse(input).is_err(), "accepted {:?}", input);
    }
}

#[test]
fn test_uri_error_reports_input() {
    let err = Uri::parse("http://host:abc/").unwrap_err();

    assert_eq!(err.input(), "http://host:abc/");
    assert!(!err.reason().is_empty());
    assert!(err.to_string().contains("http://host:abc/"));
}

#[test]
fn test_uri_from_str_and_display() {
    let uri: Uri = "http://localhost:3000/a?k=v".parse().unwrap();

    assert_eq!(uri.to_string(), "http://localhost:3000/a?k=v");
    assert_eq!(uri.path_and_query(), "/a?k=v");
}
