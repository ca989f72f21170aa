//! Service attribution for telemetry labels
//!
//! A request is attributed to a calling service with a fixed precedence:
//! explicit `X-Service-Name` (or `X-Client-Id`) first, then pattern-matching
//! against the `Origin` value, then the origin host as a generic fallback.

use axum::http::HeaderMap;

const MAX_SERVICE_LEN: usize = 64;

pub fn service_from_headers(headers: &HeaderMap) -> String {
    let explicit = header_str(headers, "x-service-name")
        .or_else(|| header_str(headers, "x-client-id"))
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(service) = explicit {
        return truncate(service);
    }

    match header_str(headers, "origin") {
        Some(origin) => service_from_origin(origin),
        None => "unknown".to_string(),
    }
}

fn service_from_origin(origin: &str) -> String {
    let lowered = origin.to_lowercase();

    if lowered.contains(":3000") || lowered.contains("open-webui") {
        return "open-webui".to_string();
    }
    if lowered.contains(":5678") || lowered.contains("n8n") {
        return "n8n".to_string();
    }
    if lowered.contains(":8080") && !lowered.contains("dashboard") {
        return "dashboard".to_string();
    }
    if lowered.contains("openclaw") || lowered.contains(":18789") || lowered.contains(":18790") {
        return "openclaw".to_string();
    }

    // fallback: host:port
    let host = origin
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split('/')
        .next()
        .unwrap_or("");

    if host.is_empty() {
        "unknown".to_string()
    } else {
        truncate(host)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn truncate(value: &str) -> String {
    value.chars().take(MAX_SERVICE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_explicit_service_name_wins() {
        let map = headers(&[
            ("x-service-name", "my-service"),
            ("origin", "http://localhost:3000"),
        ]);
        assert_eq!(service_from_headers(&map), "my-service");
    }

    #[test]
    fn test_client_id_used_when_service_name_absent() {
        let map = headers(&[("x-client-id", "batch-runner")]);
        assert_eq!(service_from_headers(&map), "batch-runner");
    }

    #[test]
    fn test_origin_patterns() {
        assert_eq!(
            service_from_headers(&headers(&[("origin", "http://localhost:3000")])),
            "open-webui"
        );
        assert_eq!(
            service_from_headers(&headers(&[("origin", "http://n8n.local:5678")])),
            "n8n"
        );
        assert_eq!(
            service_from_headers(&headers(&[("origin", "http://openclaw:18789")])),
            "openclaw"
        );
    }

    #[test]
    fn test_origin_host_fallback() {
        let map = headers(&[("origin", "https://tools.example.com/app")]);
        assert_eq!(service_from_headers(&map), "tools.example.com");
    }

    #[test]
    fn test_unknown_without_any_headers() {
        assert_eq!(service_from_headers(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn test_label_truncated_to_64_chars() {
        let long = "s".repeat(100);
        let map = headers(&[("x-service-name", long.as_str())]);
        assert_eq!(service_from_headers(&map).len(), 64);
    }
}
