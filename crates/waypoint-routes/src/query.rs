//! Query string codec
//!
//! Single-level `key=value` pairs using `application/x-www-form-urlencoded`
//! rules. Duplicate keys resolve last-wins.

use url::form_urlencoded;

use crate::location::Query;

/// Keys at or above this length are dropped
pub const MAX_QUERY_KEY_LEN: usize = 100;
/// Values are truncated to this many characters
pub const MAX_QUERY_VALUE_LEN: usize = 1000;

/// Parse a query string (with or without the leading `?`).
pub fn parse_query(input: &str) -> Query {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut query = Query::new();
    if input.is_empty() {
        return query;
    }

    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        if key.is_empty() || key.chars().count() >= MAX_QUERY_KEY_LEN {
            tracing::debug!(key_len = key.len(), "Dropping query key");
            continue;
        }

        let value = if value.chars().count() > MAX_QUERY_VALUE_LEN {
            value.chars().take(MAX_QUERY_VALUE_LEN).collect()
        } else {
            value.into_owned()
        };

        query.insert(key.into_owned(), value);
    }

    query
}

/// Serialize a query map, including the leading `?`, or an empty string.
pub fn stringify_query(query: &Query) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        serializer.append_pair(key, value);
    }
    format!("?{}", serializer.finish())
}
