//! Field scanners shared by the dialect parsers.
//!
//! - leading `[..][..]` header groups (MaaFramework main log)
//! - `[key=value]` groups inside a message, where a value may be JSON
//! - logfmt `key=value` pairs with quoted values and inline JSON objects
//! - a trailing JSON object at the end of a free-text message

use serde_json::{Map, Value};

/// Contiguous `[..]` groups at the start of `text`.
///
/// Groups must be adjacent (`][`); the first whitespace ends the header.
/// Returns the group contents and the remainder with leading spaces trimmed.
pub fn header_groups(text: &str) -> (Vec<&str>, &str) {
    let mut groups = Vec::new();
    let mut rest = text;

    while let Some(inner) = rest.strip_prefix('[') {
        match inner.find(']') {
            Some(end) => {
                groups.push(&inner[..end]);
                rest = &inner[end + 1..];
            }
            None => break,
        }
    }

    (groups, rest.trim_start())
}

/// Byte length of the JSON object or array at the start of `s`.
///
/// Only balances brackets outside string literals; validity is left to
/// serde_json.
pub fn balanced_json_len(s: &str) -> Option<usize> {
    let (open, close) = match s.as_bytes().first()? {
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &b) in s.as_bytes().iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// `[key=value]` groups anywhere in `text`, in order of appearance.
///
/// Values starting with `{` or `[` are read as balanced JSON so payloads
/// such as `[details={"list":[1,2]}]` stay intact.
pub fn bracketed_fields(text: &str) -> Vec<(&str, &str)> {
    let mut fields = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        let inner = &rest[start + 1..];
        let Some(eq) = inner.find('=') else { break };
        let key = &inner[..eq];

        if key.is_empty() || key.contains(|c: char| c == '[' || c == ']' || c.is_whitespace()) {
            rest = inner;
            continue;
        }

        let value_start = &inner[eq + 1..];
        let value_len = match balanced_json_len(value_start) {
            Some(len) if value_start[len..].starts_with(']') => len,
            _ => match value_start.find(']') {
                Some(len) => len,
                None => break,
            },
        };

        fields.push((key, &value_start[..value_len]));
        rest = &value_start[value_len + 1..];
    }

    fields
}

/// One token of a logfmt line.
#[derive(Debug, Clone, PartialEq)]
pub enum LogfmtToken {
    Pair(String, String),
    /// A bare `{...}` object, not attached to a key
    Json(String),
}

/// Logfmt tokenizer. Tokens without `=` are skipped.
pub fn logfmt_tokens(text: &str) -> Vec<LogfmtToken> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        if rest.starts_with('{') {
            if let Some(len) = balanced_json_len(rest) {
                tokens.push(LogfmtToken::Json(rest[..len].to_string()));
                rest = rest[len..].trim_start();
                continue;
            }
        }

        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = &rest[key_end..];

        if !rest.starts_with('=') || key.is_empty() {
            // garbage token, skip to the next whitespace
            let skip = rest.find(char::is_whitespace).unwrap_or(rest.len());
            rest = rest[skip..].trim_start();
            continue;
        }
        rest = &rest[1..];

        let (value, consumed) = read_value(rest);
        tokens.push(LogfmtToken::Pair(key.to_string(), value));
        rest = rest[consumed..].trim_start();
    }

    tokens
}

fn read_value(rest: &str) -> (String, usize) {
    if let Some(quoted) = rest.strip_prefix('"') {
        let mut value = String::new();
        let mut escaped = false;
        for (idx, c) in quoted.char_indices() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return (value, idx + 2);
            } else {
                value.push(c);
            }
        }
        // unterminated quote runs to the end of the line
        return (value, rest.len());
    }

    if let Some(len) = balanced_json_len(rest) {
        return (rest[..len].to_string(), len);
    }

    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    (rest[..end].to_string(), end)
}

/// Split a trailing JSON object off a free-text message.
///
/// Returns the trimmed text before the object and the parsed object.
pub fn trailing_json(text: &str) -> Option<(&str, Value)> {
    let trimmed = text.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }

    for (idx, _) in trimmed.match_indices('{') {
        let candidate = &trimmed[idx..];
        if balanced_json_len(candidate) != Some(candidate.len()) {
            continue;
        }
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
            return Some((trimmed[..idx].trim_end(), value));
        }
    }

    None
}

/// A `u64` from a JSON number or a numeric string.
pub fn json_u64(details: &Value, key: &str) -> Option<u64> {
    match details.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A non-empty string field.
pub fn json_str<'a>(details: &'a Value, key: &str) -> Option<&'a str> {
    details
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Parse a payload string, keeping it as a plain string when it is not JSON.
pub fn payload_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Fold extra `key=value` pairs into a payload without overwriting its keys.
pub fn merge_extras(payload: Option<Value>, extras: Map<String, Value>) -> Option<Value> {
    if extras.is_empty() {
        return payload;
    }
    match payload {
        Some(Value::Object(mut object)) => {
            for (key, value) in extras {
                object.entry(key).or_insert(value);
            }
            Some(Value::Object(object))
        }
        Some(other) => {
            let mut object = extras;
            object.insert("payload".to_string(), other);
            Some(Value::Object(object))
        }
        None => Some(Value::Object(extras)),
    }
}
