//! Request handling for the test responder.
//!
//! `handle` is a pure function of the request: no shared state, no I/O. The
//! HTTP layer in `http_api` adapts hyper requests into an [`Exchange`] and
//! writes the returned [`Reply`] back out.

use bytes::Bytes;
use chrono::{DateTime, Local};
use hyper::header::{self, HeaderMap};
use hyper::{Method, StatusCode};
use serde::Serialize;
use std::net::SocketAddr;

use crate::config::Variant;
use crate::envelope::{Envelope, PolicyDetails, PostDetails, SimpleDetails};

/// Timestamp layout used in envelopes and access-log lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// CORS headers sent on every GET, POST and OPTIONS reply.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Everything `handle` needs to know about one request.
#[derive(Debug)]
pub struct Exchange<'a> {
    pub method: &'a Method,
    /// Path and query exactly as received.
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    /// Body bytes as framed by the transport.
    pub body: &'a [u8],
    pub peer: SocketAddr,
    pub variant: Variant,
    pub received_at: DateTime<Local>,
}

impl Exchange<'_> {
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.received_at)
    }

    pub fn client_ip(&self) -> String {
        self.peer.ip().to_string()
    }
}

/// Status, headers and body to send back.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: Bytes,
}

impl Reply {
    fn json<D: Serialize>(envelope: &Envelope<D>) -> Self {
        let body = envelope.to_json().unwrap_or_else(|_| "{}".to_string());
        let mut headers = vec![("Content-Type", CONTENT_TYPE_JSON)];
        headers.extend(CORS_HEADERS);
        Self {
            status: StatusCode::OK,
            headers,
            body: Bytes::from(body),
        }
    }

    fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            headers: CORS_HEADERS.to_vec(),
            body: Bytes::new(),
        }
    }

    fn not_implemented() -> Self {
        Self {
            status: StatusCode::NOT_IMPLEMENTED,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Whether a request with this method produces an access-log line.
pub fn is_logged(method: &Method) -> bool {
    *method == Method::GET || *method == Method::POST
}

/// Answer one request.
pub fn handle(exchange: &Exchange<'_>) -> Reply {
    match *exchange.method {
        Method::GET => handle_get(exchange),
        Method::POST => handle_post(exchange),
        Method::OPTIONS => Reply::preflight(),
        _ => Reply::not_implemented(),
    }
}

fn handle_get(exchange: &Exchange<'_>) -> Reply {
    let timestamp = exchange.timestamp();
    let client_ip = exchange.client_ip();

    match exchange.variant {
        Variant::Policy => Reply::json(&Envelope::success(
            PolicyDetails::MESSAGE,
            timestamp,
            client_ip,
            PolicyDetails::new(exchange.path),
        )),
        Variant::Simple => {
            let user_agent = exchange
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok());
            Reply::json(&Envelope::success(
                SimpleDetails::MESSAGE,
                timestamp,
                client_ip,
                SimpleDetails::new(exchange.path, exchange.method.as_str(), user_agent),
            ))
        }
    }
}

fn handle_post(exchange: &Exchange<'_>) -> Reply {
    let body = declared_body(exchange.headers, exchange.body);
    Reply::json(&Envelope::success(
        PostDetails::MESSAGE,
        exchange.timestamp(),
        exchange.client_ip(),
        PostDetails {
            received_body: String::from_utf8_lossy(body).into_owned(),
        },
    ))
}

/// The part of `body` covered by the request's Content-Length.
///
/// An unparsable Content-Length yields an empty body. Without the header the
/// framed body is used as-is (empty unless the client sent it chunked).
pub fn declared_body<'a>(headers: &HeaderMap, body: &'a [u8]) -> &'a [u8] {
    let Some(value) = headers.get(header::CONTENT_LENGTH) else {
        return body;
    };
    match value.to_str().ok().and_then(|s| s.trim().parse::<usize>().ok()) {
        Some(len) => &body[..len.min(body.len())],
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn peer() -> SocketAddr {
        "192.168.1.44:51234".parse().unwrap()
    }

    fn exchange<'a>(
        method: &'a Method,
        path: &'a str,
        headers: &'a HeaderMap,
        body: &'a [u8],
        variant: Variant,
    ) -> Exchange<'a> {
        Exchange {
            method,
            path,
            headers,
            body,
            peer: peer(),
            variant,
            received_at: Local::now(),
        }
    }

    fn json_body(reply: &Reply) -> serde_json::Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn assert_cors(reply: &Reply) {
        assert_eq!(reply.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(
            reply.header("Access-Control-Allow-Methods"),
            Some("GET, POST, OPTIONS")
        );
        assert_eq!(reply.header("Access-Control-Allow-Headers"), Some("Content-Type"));
    }

    #[test]
    fn test_get_policy_variant() {
        let headers = HeaderMap::new();
        let reply = handle(&exchange(&Method::GET, "/anything", &headers, b"", Variant::Policy));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.header("Content-Type"), Some("application/json"));
        assert_cors(&reply);

        let body = json_body(&reply);
        assert_eq!(body["status"], "success");
        assert_eq!(body["requested_path"], "/anything");
        assert_eq!(body["client_ip"], "192.168.1.44");
        assert_eq!(
            body["test_info"]["policy"],
            "LocalNetworkAccessRestrictionsEnabled"
        );
    }

    #[test]
    fn test_get_echoes_query_verbatim() {
        let headers = HeaderMap::new();
        let path = "/../etc/passwd?x=1&y=%20";
        let reply = handle(&exchange(&Method::GET, path, &headers, b"", Variant::Policy));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(json_body(&reply)["requested_path"], path);
    }

    #[test]
    fn test_get_simple_variant_reports_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Edge/138"));
        let reply = handle(&exchange(&Method::GET, "/ping", &headers, b"", Variant::Simple));
        let body = json_body(&reply);
        assert_eq!(body["request_info"]["path"], "/ping");
        assert_eq!(body["request_info"]["method"], "GET");
        assert_eq!(body["request_info"]["user_agent"], "Edge/138");
        assert_eq!(body["server_info"]["server"], "simple-test-server");
        assert!(body.get("requested_path").is_none());
    }

    #[test]
    fn test_get_simple_variant_unknown_user_agent() {
        let headers = HeaderMap::new();
        let reply = handle(&exchange(&Method::GET, "/", &headers, b"", Variant::Simple));
        assert_eq!(json_body(&reply)["request_info"]["user_agent"], "Unknown");
    }

    #[test]
    fn test_post_echoes_body() {
        let body = r#"{"probe":"テスト"}"#.as_bytes();
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        let reply = handle(&exchange(&Method::POST, "/", &headers, body, Variant::Policy));
        assert_eq!(reply.status, StatusCode::OK);
        assert_cors(&reply);
        let json = json_body(&reply);
        assert_eq!(json["status"], "success");
        assert_eq!(json["received_body"], r#"{"probe":"テスト"}"#);
    }

    #[test]
    fn test_post_invalid_utf8_uses_placeholder() {
        let headers = HeaderMap::new();
        let reply = handle(&exchange(&Method::POST, "/", &headers, &[b'o', 0xff, b'k'], Variant::Policy));
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(json_body(&reply)["received_body"], "o\u{fffd}k");
    }

    #[test]
    fn test_post_same_shape_for_simple_variant() {
        let headers = HeaderMap::new();
        let reply = handle(&exchange(&Method::POST, "/", &headers, b"hi", Variant::Simple));
        assert_eq!(json_body(&reply)["received_body"], "hi");
    }

    #[test]
    fn test_options_is_bare_preflight() {
        let mut headers = HeaderMap::new();
        headers.insert("Access-Control-Request-Method", HeaderValue::from_static("PUT"));
        headers.insert("Origin", HeaderValue::from_static("https://example.com"));
        let reply = handle(&exchange(&Method::OPTIONS, "/x", &headers, b"", Variant::Policy));
        assert_eq!(reply.status, StatusCode::OK);
        assert_cors(&reply);
        assert_eq!(reply.header("Content-Type"), None);
        assert!(reply.body.is_empty());
        assert_eq!(reply.headers.len(), 3);
    }

    #[test]
    fn test_other_methods_not_implemented() {
        let headers = HeaderMap::new();
        for method in [Method::PUT, Method::DELETE, Method::HEAD, Method::PATCH] {
            let reply = handle(&exchange(&method, "/", &headers, b"", Variant::Policy));
            assert_eq!(reply.status, StatusCode::NOT_IMPLEMENTED);
            assert!(reply.headers.is_empty());
        }
    }

    #[test]
    fn test_declared_body_truncates_to_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("3"));
        assert_eq!(declared_body(&headers, b"abcdef"), b"abc");
    }

    #[test]
    fn test_declared_body_non_integer_is_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("ten"));
        assert_eq!(declared_body(&headers, b"abcdef"), b"");
    }

    #[test]
    fn test_declared_body_without_header_uses_framed_body() {
        let headers = HeaderMap::new();
        assert_eq!(declared_body(&headers, b""), b"");
        assert_eq!(declared_body(&headers, b"chunked"), b"chunked");
    }

    #[test]
    fn test_declared_body_longer_than_received() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("100"));
        assert_eq!(declared_body(&headers, b"short"), b"short");
    }

    #[test]
    fn test_timestamp_format() {
        let at = chrono::NaiveDate::from_ymd_opt(2026, 1, 30)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap();
        assert_eq!(format_timestamp(&at), "2026-01-30 09:05:07");
    }

    #[test]
    fn test_is_logged() {
        assert!(is_logged(&Method::GET));
        assert!(is_logged(&Method::POST));
        assert!(!is_logged(&Method::OPTIONS));
        assert!(!is_logged(&Method::PUT));
    }
}
