//! Recover a structured record from the reasoning loop's final message.
//!
//! The model is instructed to answer with a single JSON object, but real
//! answers arrive wrapped in prose or markdown fences, and smaller models
//! like to emit Python-style literals (single quotes, True/False/None). The
//! extractor never fails: anything unrecoverable comes back as `None` and is
//! dealt with by schema validation downstream.

use serde_json::Value;

/// Extract the outermost brace span and parse it, strictly first, then with
/// the lenient literal rewrite.
pub fn extract_record(text: &str) -> Option<Value> {
    let span = brace_span(text)?;
    if let Ok(value) = serde_json::from_str::<Value>(span) {
        return as_object(value);
    }
    let rewritten = rewrite_literals(span);
    serde_json::from_str::<Value>(&rewritten)
        .ok()
        .and_then(as_object)
}

fn as_object(value: Value) -> Option<Value> {
    value.is_object().then_some(value)
}

/// First `{` through last `}`, tolerating surrounding prose and fences.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Rewrite Python-ish literals into JSON: single-quoted strings become
/// double-quoted, bare True/False/None become true/false/null. Quote state
/// is tracked so keywords inside string values are left alone.
fn rewrite_literals(span: &str) -> String {
    enum State {
        Outside,
        Single,
        Double,
    }

    let mut out = String::with_capacity(span.len());
    let mut state = State::Outside;
    let mut chars = span.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Outside => match ch {
                '\'' => {
                    out.push('"');
                    state = State::Single;
                }
                '"' => {
                    out.push('"');
                    state = State::Double;
                }
                c if c.is_ascii_alphabetic() => {
                    let mut word = String::new();
                    word.push(c);
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            word.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    match word.as_str() {
                        "True" => out.push_str("true"),
                        "False" => out.push_str("false"),
                        "None" => out.push_str("null"),
                        _ => out.push_str(&word),
                    }
                }
                c => out.push(c),
            },
            State::Single => match ch {
                '\\' => match chars.next() {
                    // \' inside a single-quoted string needs no escape in JSON
                    Some('\'') => out.push('\''),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                },
                '"' => out.push_str("\\\""),
                '\'' => {
                    out.push('"');
                    state = State::Outside;
                }
                c => out.push(c),
            },
            State::Double => match ch {
                '\\' => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => {
                    out.push('"');
                    state = State::Outside;
                }
                c => out.push(c),
            },
        }
    }
    out
}
