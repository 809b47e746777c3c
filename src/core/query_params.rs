use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use fritter::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/api/follows?username=john&page=2");
/// assert_eq!(params.get("username"), Some(&"john".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                params.insert(key.to_string(), decode(&param[eq_idx + 1..]));
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Path component of a request URI, without scheme, authority or query.
///
/// ```
/// use fritter::core::query_params::request_path;
///
/// assert_eq!(request_path("http://localhost:3000/api/feed?x=1"), "/api/feed");
/// assert_eq!(request_path("/api/follows/bob"), "/api/follows/bob");
/// ```
pub fn request_path(uri: &str) -> &str {
    let without_scheme = match uri.find("://") {
        Some(idx) => {
            let rest = &uri[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("/")
        }
        None => uri,
    };
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Decode a query value: `+` is a space, then percent escapes.
pub fn decode(value: &str) -> String {
    decode_path_segment(&value.replace('+', " "))
}

/// Percent-decode a path segment. `+` stays literal.
pub fn decode_path_segment(value: &str) -> String {
    urlencoding::decode(value)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_encoded_values() {
        let params = parse_query_params("/api/follows?username=a%20b&flag");
        assert_eq!(params.get("username").map(String::as_str), Some("a b"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn plus_means_space_only_in_queries() {
        let params = parse_query_params("/api/follows?username=a+b");
        assert_eq!(params.get("username").map(String::as_str), Some("a b"));
        assert_eq!(decode_path_segment("a+b"), "a+b");
        assert_eq!(decode_path_segment("a%2Bb"), "a+b");
    }

    #[test]
    fn missing_query_yields_no_params() {
        assert!(parse_query_params("/api/follows").is_empty());
    }

    #[test]
    fn path_is_stripped_of_trailing_parts() {
        assert_eq!(request_path("/api/follows?username=bob"), "/api/follows");
        assert_eq!(request_path("https://host"), "/");
        assert_eq!(request_path(""), "/");
    }
}
