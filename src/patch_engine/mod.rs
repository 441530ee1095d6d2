//! Applies a single [`Edit`] to in-memory file content.
//!
//! Both diff encodings reduce to a list of [`SearchReplaceBlock`]s which are
//! applied in document order. A block whose search text is not found is
//! skipped and reported; applying an edit never fails.

pub(crate) mod envelope;
pub(crate) mod search_replace;


use crate::response_parser::{Edit, EditKind};
pub(crate) use search_replace::SearchReplaceBlock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PatchOutcome {
    pub content: String,
    /// Number of blocks (or full rewrites) that landed.
    pub resolved: usize,
    /// Blocks whose search text was not found in the content.
    pub unresolved: Vec<SearchReplaceBlock>,
}

pub(crate) fn apply(current: Option<&str>, edit: &Edit) -> PatchOutcome {
    match edit.kind {
        EditKind::FullRewrite => PatchOutcome {
            content: edit.content.clone(),
            resolved: 1,
            unresolved: Vec::new(),
        },
        EditKind::SearchReplaceDiff => {
            let blocks = search_replace::parse_blocks(&edit.content);
            search_replace::apply_blocks(current, &blocks)
        }
        EditKind::UnifiedPatchEnvelope => {
            let blocks = envelope::to_blocks(&edit.content, &edit.file_path);
            search_replace::apply_blocks(current, &blocks)
        }
    }
}
