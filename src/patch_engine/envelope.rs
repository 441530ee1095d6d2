use super::search_replace::SearchReplaceBlock;
use std::path::Path;

const BEGIN_PATCH: &str = "*** Begin Patch";
const END_PATCH: &str = "*** End Patch";
const UPDATE_FILE: &str = "*** Update File:";
const END_OF_FILE: &str = "*** End of File";
const HUNK_HEADER: &str = "@@";

struct Section<'a> {
    path: Option<String>,
    lines: Vec<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HunkLine<'a> {
    Context(&'a str),
    Removed(&'a str),
    Added(&'a str),
    // A line with no prefix at all; kept as context unless it pads the hunk.
    Blank,
}

/// Reduces the envelope's section for `target` to search/replace blocks, one
/// per `@@` hunk.
///
/// An envelope with no `*** Update File:` header at all is read as a single
/// section for `target`.
pub(crate) fn to_blocks(envelope: &str, target: &Path) -> Vec<SearchReplaceBlock> {
    let sections = split_sections(envelope);
    let has_headers = sections.iter().any(|s| s.path.is_some());
    let target = normalize_path(&target.to_string_lossy());

    sections
        .iter()
        .filter(|section| match &section.path {
            Some(path) => *path == target,
            None => !has_headers,
        })
        .flat_map(|section| hunks(&section.lines))
        .collect()
}

fn split_sections(envelope: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current = Section {
        path: None,
        lines: Vec::new(),
    };

    for raw in envelope.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = line.trim_end();

        if trimmed == BEGIN_PATCH || trimmed == END_OF_FILE {
            continue;
        }
        if trimmed == END_PATCH {
            break;
        }
        if let Some(path) = trimmed.strip_prefix(UPDATE_FILE) {
            sections.push(current);
            current = Section {
                path: Some(normalize_path(path)),
                lines: Vec::new(),
            };
            continue;
        }
        if trimmed.starts_with("*** ") {
            // Add/Delete/Move sections are not update hunks; close the current one.
            sections.push(current);
            current = Section {
                path: Some(String::new()),
                lines: Vec::new(),
            };
            continue;
        }
        current.lines.push(line);
    }
    sections.push(current);

    sections
        .into_iter()
        .filter(|s| !s.lines.is_empty() && s.path.as_deref() != Some(""))
        .collect()
}

fn hunks(lines: &[&str]) -> Vec<SearchReplaceBlock> {
    let mut blocks = Vec::new();
    let mut hunk = Vec::new();

    for line in lines {
        if line.starts_with(HUNK_HEADER) {
            blocks.extend(hunk_to_block(&hunk));
            hunk.clear();
            continue;
        }
        if line.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }
        let parsed = if let Some(added) = line.strip_prefix('+') {
            HunkLine::Added(added)
        } else if let Some(removed) = line.strip_prefix('-') {
            HunkLine::Removed(removed)
        } else if let Some(context) = line.strip_prefix(' ') {
            HunkLine::Context(context)
        } else if line.is_empty() {
            HunkLine::Blank
        } else {
            HunkLine::Context(line)
        };
        hunk.push(parsed);
    }
    blocks.extend(hunk_to_block(&hunk));

    blocks
}

fn hunk_to_block(hunk: &[HunkLine<'_>]) -> Option<SearchReplaceBlock> {
    let start = hunk.iter().position(|l| *l != HunkLine::Blank)?;
    let end = hunk.iter().rposition(|l| *l != HunkLine::Blank)?;

    let mut search = Vec::new();
    let mut replace = Vec::new();
    for line in &hunk[start..=end] {
        match *line {
            HunkLine::Context(text) => {
                search.push(text);
                replace.push(text);
            }
            HunkLine::Blank => {
                search.push("");
                replace.push("");
            }
            HunkLine::Removed(text) => search.push(text),
            HunkLine::Added(text) => replace.push(text),
        }
    }

    if search == replace {
        return None;
    }
    Some(SearchReplaceBlock {
        search: search.join("\n"),
        replace: replace.join("\n"),
    })
}

fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}
