use crate::app_error::AppError;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

const FENCE: &str = "```";
const PREVIEW_CHARS: usize = 200;

// Multi-line diff payloads that models emit inside a JSON string without escaping.
static UNESCAPED_DIFF_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""content"\s*:\s*"(<<<<<<< SEARCH[\s\S]*?>>>>>>> REPLACE[ \t\r\n]*)""#)
        .expect("diff content pattern is valid")
});
static UNESCAPED_PATCH_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""content"\s*:\s*"(\*\*\* Begin Patch[\s\S]*?\*\*\* End Patch[ \t\r\n]*)""#)
        .expect("patch content pattern is valid")
});

type Strategy = fn(&str) -> Option<String>;

/// Candidate extraction strategies, in priority order. The first candidate
/// that parses as strict JSON wins.
const STRATEGIES: [Strategy; 5] = [
    fenced_block,
    unterminated_fence,
    whole_text,
    array_span,
    object_span,
];

/// Extracts the JSON value a response encodes.
///
/// The text is tried as written first. Only if no candidate parses is it
/// retried with unescaped diff payloads repaired, so the repair can never
/// break a response that was already valid.
pub(crate) fn normalize(text: &str) -> Result<Value, AppError> {
    if let Some(value) = first_candidate(text) {
        return Ok(value);
    }
    let repaired = repair_unescaped_content(text);
    if repaired != text {
        if let Some(value) = first_candidate(&repaired) {
            return Ok(value);
        }
    }

    Err(AppError::UnparseableResponse(format!(
        "No JSON object or array could be extracted from the response. Response preview: {}",
        preview(text)
    )))
}

pub(crate) fn fenced_block(text: &str) -> Option<String> {
    let open = text.find(FENCE)?;
    let rest = &text[open + FENCE.len()..];
    let close = rest.find(FENCE)?;
    Some(strip_language_tag(&rest[..close]).trim().to_string())
}

pub(crate) fn unterminated_fence(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) && !trimmed.ends_with(FENCE) {
        return None;
    }
    let without_open = match trimmed.strip_prefix(FENCE) {
        Some(rest) => strip_language_tag(rest),
        None => trimmed,
    };
    let without_close = without_open.strip_suffix(FENCE).unwrap_or(without_open);
    Some(without_close.trim().to_string())
}

pub(crate) fn whole_text(text: &str) -> Option<String> {
    Some(text.trim().to_string())
}

/// Only a top-level array qualifies: an array that opens after the first `{`
/// is nested inside an object and must not be mistaken for a bare edit list.
pub(crate) fn array_span(text: &str) -> Option<String> {
    let start = text.find('[')?;
    if text.find('{').is_some_and(|brace| brace < start) {
        return None;
    }
    let end = text.rfind(']')?;
    (start < end).then(|| text[start..=end].to_string())
}

pub(crate) fn object_span(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| text[start..=end].to_string())
}

fn strip_language_tag(block: &str) -> &str {
    let trimmed = block.trim_start_matches([' ', '\t']);
    match trimmed.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &trimmed[4..],
        _ => block,
    }
}

/// Re-escapes `"content": "<<<<<<< SEARCH ... >>>>>>> REPLACE"` (and the patch
/// envelope equivalent) when the string spans raw newlines.
pub(crate) fn repair_unescaped_content(text: &str) -> String {
    let mut repaired = text.to_string();
    for re in [&*UNESCAPED_DIFF_CONTENT, &*UNESCAPED_PATCH_CONTENT] {
        repaired = re
            .replace_all(&repaired, |caps: &Captures| {
                let raw = &caps[1];
                if !raw.contains('\n') {
                    return caps[0].to_string();
                }
                match serde_json::to_string(raw) {
                    Ok(escaped) => format!("\"content\": {escaped}"),
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned();
    }
    repaired
}

fn first_candidate(text: &str) -> Option<Value> {
    STRATEGIES
        .iter()
        .filter_map(|strategy| strategy(text))
        .find_map(|candidate| serde_json::from_str::<Value>(&candidate).ok())
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
