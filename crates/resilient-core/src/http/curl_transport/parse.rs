//! Parse libcurl header lines into a `HeaderMap` and protocol version.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Version;

/// Protocol version from the last status line (`HTTP/1.0 200 OK`, `HTTP/2 200`).
/// HTTP/1.1 when there is none or it is not recognised.
pub(crate) fn parse_version(lines: &[String]) -> Version {
    let status_line = lines.iter().rev().find(|l| l.starts_with("HTTP/"));
    let proto = status_line.and_then(|l| l.split_whitespace().next());
    match proto {
        Some("HTTP/0.9") => Version::HTTP_09,
        Some("HTTP/1.0") => Version::HTTP_10,
        Some("HTTP/2") | Some("HTTP/2.0") => Version::HTTP_2,
        Some("HTTP/3") | Some("HTTP/3.0") => Version::HTTP_3,
        _ => Version::HTTP_11,
    }
}

/// Builds the header map of the final response from the raw header lines.
///
/// libcurl reports the headers of every response it sees (redirect hops,
/// `100 Continue`); each status line starts a new block and only the last
/// block is kept. Lines that are not valid headers are skipped.
pub(crate) fn parse_headers(lines: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in lines {
        let line = line.trim_end();
        if line.starts_with("HTTP/") {
            headers.clear();
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = HeaderName::from_bytes(name.trim().as_bytes());
            let value = HeaderValue::from_str(value.trim());
            if let (Ok(name), Ok(value)) = (name, value) {
                headers.append(name, value);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_headers_basic() {
        let h = parse_headers(&lines(&[
            "HTTP/1.1 200 OK",
            "Content-Length: 12345",
            "Content-Type: text/plain",
            "",
        ]));
        assert_eq!(h.get("content-length").unwrap(), "12345");
        assert_eq!(h.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn parse_headers_keeps_last_block() {
        let h = parse_headers(&lines(&[
            "HTTP/1.1 301 Moved Permanently",
            "Location: http://example.com/next",
            "",
            "HTTP/1.1 200 OK",
            "ETag: \"abc\"",
            "",
        ]));
        assert!(h.get("location").is_none());
        assert_eq!(h.get("etag").unwrap(), "\"abc\"");
    }

    #[test]
    fn parse_headers_repeated_names() {
        let h = parse_headers(&lines(&[
            "HTTP/1.1 200 OK",
            "Set-Cookie: a=1",
            "Set-Cookie: b=2",
        ]));
        assert_eq!(h.get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn parse_version_from_last_status_line() {
        let v = parse_version(&lines(&[
            "HTTP/1.1 301 Moved Permanently",
            "Location: https://example.com/",
            "",
            "HTTP/2 200",
            "content-type: text/plain",
        ]));
        assert_eq!(v, Version::HTTP_2);
        assert_eq!(parse_version(&lines(&["HTTP/1.0 200 OK"])), Version::HTTP_10);
        assert_eq!(parse_version(&lines(&["HTTP/3 204"])), Version::HTTP_3);
    }

    #[test]
    fn parse_version_defaults_to_http11() {
        assert_eq!(parse_version(&[]), Version::HTTP_11);
        assert_eq!(parse_version(&lines(&["HTTP/9 200"])), Version::HTTP_11);
    }

    #[test]
    fn parse_headers_skips_garbage() {
        let h = parse_headers(&lines(&["HTTP/1.1 200 OK", "not a header", "Bad Name: x"]));
        assert!(h.is_empty());
    }
}
