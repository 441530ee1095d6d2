use super::PatchOutcome;

pub(crate) const SEARCH_MARKER: &str = "<<<<<<< SEARCH";
pub(crate) const DIVIDER_MARKER: &str = "=======";
pub(crate) const REPLACE_MARKER: &str = ">>>>>>> REPLACE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchReplaceBlock {
    pub search: String,
    pub replace: String,
}

impl SearchReplaceBlock {
    /// Renders the block back into the `<<<<<<< SEARCH` diff syntax.
    #[cfg(test)]
    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(SEARCH_MARKER);
        out.push('\n');
        push_body(&mut out, &self.search);
        out.push_str(DIVIDER_MARKER);
        out.push('\n');
        push_body(&mut out, &self.replace);
        out.push_str(REPLACE_MARKER);
        out
    }
}

#[cfg(test)]
fn push_body(out: &mut String, body: &str) {
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
}

enum State {
    Seeking,
    Search { body_start: usize },
    Replace { search: String, body_start: usize },
}

/// Scans `diff` for `SEARCH` / `=======` / `REPLACE` marker lines.
///
/// Markers only count at the start of a line. An unterminated block yields
/// nothing, and a new `SEARCH` marker abandons any block still open.
pub(crate) fn parse_blocks(diff: &str) -> Vec<SearchReplaceBlock> {
    let mut blocks = Vec::new();
    let mut state = State::Seeking;
    let mut offset = 0;

    for line in diff.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let marker = line.trim_end();

        if marker == SEARCH_MARKER {
            state = State::Search { body_start: offset };
            continue;
        }

        state = match state {
            State::Search { body_start } if marker == DIVIDER_MARKER => State::Replace {
                search: strip_final_newline(&diff[body_start..line_start]).to_string(),
                body_start: offset,
            },
            State::Replace { search, body_start } if marker == REPLACE_MARKER => {
                blocks.push(SearchReplaceBlock {
                    search,
                    replace: strip_final_newline(&diff[body_start..line_start]).to_string(),
                });
                State::Seeking
            }
            other => other,
        };
    }

    blocks
}

fn strip_final_newline(body: &str) -> &str {
    let body = body.strip_suffix('\n').unwrap_or(body);
    body.strip_suffix('\r').unwrap_or(body)
}

pub(crate) fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Applies `blocks` in order, each against the result of the previous one.
///
/// Matching runs on line-ending-normalized text, but the match is spliced
/// into the content as written: bytes outside a resolved match are never
/// touched, and the replacement goes in verbatim.
pub(crate) fn apply_blocks(current: Option<&str>, blocks: &[SearchReplaceBlock]) -> PatchOutcome {
    let mut content = current.unwrap_or_default().to_string();
    let mut resolved = 0;
    let mut unresolved = Vec::new();

    for block in blocks {
        let needle = normalize_line_endings(&block.search);
        let (haystack, offsets) = normalize_with_offsets(&content);
        match haystack.find(&needle) {
            Some(start) => {
                let range = offsets[start]..offsets[start + needle.len()];
                content.replace_range(range, &block.replace);
                resolved += 1;
            }
            None => unresolved.push(block.clone()),
        }
    }

    PatchOutcome {
        content,
        resolved,
        unresolved,
    }
}

/// Line-ending-normalized `text` plus, for every byte of it (and one past the
/// end), the matching byte offset in `text`. A `\r\n` pair maps to its `\r`.
fn normalize_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut normalized = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len() + 1);
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch == '\r' {
            if chars.peek().is_some_and(|&(_, next)| next == '\n') {
                chars.next();
            }
            normalized.push('\n');
            offsets.push(index);
            continue;
        }
        normalized.push(ch);
        offsets.extend((0..ch.len_utf8()).map(|k| index + k));
    }
    offsets.push(text.len());

    (normalized, offsets)
}
