use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

/// Client address for the audit log. Forwarding headers are only honoured
/// when the connection itself comes from a trusted proxy.
pub fn get_client_ip(parts: &Parts, trusted_proxies: &[IpAddr]) -> Option<String> {
    let connection_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .or_else(|| parts.extensions.get::<SocketAddr>().map(|addr| addr.ip()));

    if let Some(conn_ip) = connection_ip {
        if trusted_proxies.contains(&conn_ip) {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            if forwarded.is_some() {
                return forwarded;
            }

            if let Some(real_ip) = parts
                .headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
            {
                return Some(real_ip.trim().to_string());
            }
        }
    }

    connection_ip.map(|ip| ip.to_string())
}

/// Snapshot of the allow-listed headers. Absent or non-UTF-8 values are
/// recorded as `None`.
pub fn capture_headers(headers: &HeaderMap, allowed: &[String]) -> BTreeMap<String, Option<String>> {
    allowed
        .iter()
        .map(|name| {
            let name = name.to_ascii_lowercase();
            let value = headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            (name, value)
        })
        .collect()
}

/// The bearer token, if the Authorization header carries one.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Subscriber number from a JSON object body. Accepts strings and numbers;
/// empty strings count as absent.
pub fn extract_subscriber(body: Option<&Value>, field: &str) -> Option<String> {
    match body?.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Declared `content-length`, else the size of the compact JSON form of the
/// parsed body (`{}` when there is none).
pub fn request_size(headers: &HeaderMap, body: Option<&Value>) -> u64 {
    if let Some(len) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return len;
    }

    match body {
        Some(value) => serde_json::to_vec(value).map(|v| v.len() as u64).unwrap_or(0),
        None => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;

    fn parts(req: Request<Body>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn test_get_client_ip_from_trusted_proxy() {
        let req = Request::builder()
            .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 8080))))
            .header("x-forwarded-for", "192.168.1.1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        let trusted: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap()];
        assert_eq!(
            get_client_ip(&parts(req), &trusted),
            Some("192.168.1.1".to_string())
        );
    }

    #[test]
    fn test_get_client_ip_from_real_ip() {
        let req = Request::builder()
            .extension(SocketAddr::from(([10, 0, 0, 1], 8080)))
            .header("x-real-ip", "192.168.1.100")
            .body(Body::empty())
            .unwrap();

        let trusted: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap()];
        assert_eq!(
            get_client_ip(&parts(req), &trusted),
            Some("192.168.1.100".to_string())
        );
    }

    #[test]
    fn test_forwarded_header_ignored_from_untrusted_peer() {
        let req = Request::builder()
            .extension(ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 5000))))
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            get_client_ip(&parts(req), &[]),
            Some("203.0.113.7".to_string())
        );
    }

    #[test]
    fn test_get_client_ip_fallback() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(get_client_ip(&parts(req), &[]).is_none());
    }

    #[test]
    fn test_capture_headers_allow_list() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", "curl/8".parse().unwrap());
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert("x-custom", "1".parse().unwrap());

        let allowed = vec!["User-Agent".to_string(), "origin".to_string()];
        let captured = capture_headers(&headers, &allowed);

        assert_eq!(captured.len(), 2);
        assert_eq!(captured["user-agent"].as_deref(), Some("curl/8"));
        assert_eq!(captured["origin"], None);
        assert!(!captured.contains_key("authorization"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn test_extract_subscriber() {
        let field = "subscriberNo";
        assert_eq!(
            extract_subscriber(Some(&json!({ "subscriberNo": "555" })), field),
            Some("555".to_string())
        );
        assert_eq!(
            extract_subscriber(Some(&json!({ "subscriberNo": 555 })), field),
            Some("555".to_string())
        );
        assert_eq!(
            extract_subscriber(Some(&json!({ "subscriberNo": "" })), field),
            None
        );
        assert_eq!(extract_subscriber(Some(&json!({ "other": 1 })), field), None);
        assert_eq!(extract_subscriber(Some(&json!([1, 2])), field), None);
        assert_eq!(extract_subscriber(None, field), None);
    }

    #[test]
    fn test_request_size() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_size(&headers, None), 2);

        let body = json!({ "a": 1 });
        assert_eq!(request_size(&headers, Some(&body)), 7);

        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        assert_eq!(request_size(&headers, Some(&body)), 42);

        headers.insert(header::CONTENT_LENGTH, "nope".parse().unwrap());
        assert_eq!(request_size(&headers, None), 2);
    }
}
