use std::collections::HashMap;

/// Decode a `key=value&key2=value2` string as produced by HTML forms.
///
/// `+` is read as a space before percent-decoding. Repeated keys keep the
/// last value; a bare `key` maps to an empty string.
pub fn parse_pairs(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for param in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        params.insert(decode_component(key), decode_component(value));
    }

    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Parse query parameters from a URI string
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.split_once('?') {
        Some((_, query)) => parse_pairs(query.split('#').next().unwrap_or("")),
        None => HashMap::new(),
    }
}

/// Parse an `application/x-www-form-urlencoded` request body
pub fn parse_form(body: &[u8]) -> HashMap<String, String> {
    parse_pairs(&String::from_utf8_lossy(body))
}

pub fn get_string(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

/// Checkbox-style flag: present with `y`, `on`, `true` or `1`
pub fn get_bool_flag(params: &HashMap<String, String>, key: &str) -> bool {
    params
        .get(key)
        .map(|v| matches!(v.as_str(), "y" | "on" | "true" | "1"))
        .unwrap_or(false)
}

/// Get a 1-based page number, falling back to 1 on anything unparsable
pub fn get_page(params: &HashMap<String, String>) -> usize {
    params
        .get("page")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}
