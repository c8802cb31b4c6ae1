//! Per-request overrides read from the query string, with header fallback.

use hyper::HeaderMap;
use std::collections::HashMap;

pub const STATUS_PARAM: &str = "_statusCode";
pub const STATUS_HEADER: &str = "x-mock-status-code";
pub const FORCE_EXAMPLE_PARAM: &str = "_forceExample";
pub const FORCE_EXAMPLE_HEADER: &str = "x-mock-force-example";

/// Requested status that draws uniformly from the route's status keys.
pub const RANDOM_STATUS: &str = "random";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    pub status: Option<String>,
    pub force_example: Option<String>,
}

impl RequestOverrides {
    /// Query parameters win over headers; empty values count as absent.
    pub fn from_request(query: &HashMap<String, String>, headers: &HeaderMap) -> Self {
        Self {
            status: pick(query, headers, STATUS_PARAM, STATUS_HEADER),
            force_example: pick(query, headers, FORCE_EXAMPLE_PARAM, FORCE_EXAMPLE_HEADER),
        }
    }

    pub fn forces_example(&self) -> bool {
        self.force_example.as_deref() == Some("true")
    }
}

fn pick(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    param: &str,
    header: &str,
) -> Option<String> {
    query
        .get(param)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get(header)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

/// Decode a query string into a map; later duplicates win.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.replace('+', " ");
            let value = value.replace('+', " ");
            (
                urlencoding::decode(&key).map(|k| k.into_owned()).unwrap_or(key),
                urlencoding::decode(&value).map(|v| v.into_owned()).unwrap_or(value),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_parse_query_string() {
        let query = parse_query_string("_statusCode=404&name=a%20b&flag&plus=x+y");
        assert_eq!(query["_statusCode"], "404");
        assert_eq!(query["name"], "a b");
        assert_eq!(query["flag"], "");
        assert_eq!(query["plus"], "x y");
        assert!(parse_query_string("").is_empty());
    }

    #[test]
    fn test_query_beats_header() {
        let query = parse_query_string("_statusCode=404");
        let overrides =
            RequestOverrides::from_request(&query, &headers(&[(STATUS_HEADER, "500")]));
        assert_eq!(overrides.status.as_deref(), Some("404"));
    }

    #[test]
    fn test_header_fallback() {
        let overrides = RequestOverrides::from_request(
            &HashMap::new(),
            &headers(&[(STATUS_HEADER, "500"), (FORCE_EXAMPLE_HEADER, "true")]),
        );
        assert_eq!(overrides.status.as_deref(), Some("500"));
        assert!(overrides.forces_example());
    }

    #[test]
    fn test_empty_values_are_absent() {
        let query = parse_query_string("_statusCode=&_forceExample=");
        let overrides =
            RequestOverrides::from_request(&query, &headers(&[(STATUS_HEADER, "201")]));
        assert_eq!(overrides.status.as_deref(), Some("201"));
        assert_eq!(overrides.force_example, None);
        assert!(!overrides.forces_example());
    }

    #[test]
    fn test_force_example_requires_literal_true() {
        for value in ["TRUE", "1", "yes", "false"] {
            let query = parse_query_string(&format!("_forceExample={value}"));
            let overrides = RequestOverrides::from_request(&query, &HeaderMap::new());
            assert!(!overrides.forces_example(), "{value} should not force");
        }
    }
}
