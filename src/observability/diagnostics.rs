//! Error response reports.
//!
//! ```text
//! RESPONSE ERROR:
//!   url: http://localhost/items
//!   status: 500
//!   headers:     x-extra:1
//!   body: {"code":"server","message":"boom","status_code":500}
//! ```

use std::fmt::Write;

use axum::http::StatusCode;

use crate::http::response::RouteResponse;

/// Render the multi-line report for a normalized error response.
pub fn render_response_error(url: &str, response: &RouteResponse) -> String {
    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| (name, value)))
        .fold(String::new(), |mut acc, (name, value)| {
            let _ = writeln!(acc, "    {}:{}", name, value);
            acc
        });
    let body = response
        .body
        .as_ref()
        .map(|body| body.preview())
        .unwrap_or_else(|| "<unknown>".to_string());

    format!(
        "RESPONSE ERROR:\n  url: {}\n  status: {}\n  headers: {}\n  body: {}",
        url,
        response.status_or_default().as_u16(),
        headers,
        body
    )
}

/// Whether a normalized error response should be reported at all.
pub fn should_report(status: StatusCode) -> bool {
    status != StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RespError;
    use crate::http::response::ResponseBody;
    use futures_util::stream;

    #[test]
    fn test_renders_error_response() {
        let response = RespError::server("boom").with_header("x-extra", "1").to_response();
        let report = render_response_error("http://localhost/items", &response);
        assert!(report.starts_with(
            "RESPONSE ERROR:\n  url: http://localhost/items\n  status: 500\n  headers:     x-extra:1\n\n  body: {"
        ));
        assert!(report.contains(r#""message":"boom""#));
        assert!(report.contains(r#""code":"server""#));
    }

    #[test]
    fn test_stream_body_uses_placeholder() {
        let chunks = stream::iter(vec![Ok::<_, std::io::Error>(axum::body::Bytes::from("x"))]);
        let response = RouteResponse::new().with_body(ResponseBody::stream(chunks));
        let report = render_response_error("/", &response);
        assert!(report.ends_with("body: <stream>"));
    }

    #[test]
    fn test_not_found_is_not_reported() {
        assert!(!should_report(StatusCode::NOT_FOUND));
        assert!(should_report(StatusCode::BAD_REQUEST));
        assert!(should_report(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
