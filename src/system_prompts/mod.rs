//! Outbound instruction text. The schema described here is exactly what the
//! response parser accepts; change both together.


use serde::{Deserialize, Serialize};

pub const RESPONSE_FORMAT: &str = include_str!("response_format.txt");
pub const SEARCH_REPLACE_SYNTAX: &str = include_str!("search_replace_syntax.txt");
pub const PATCH_SYNTAX: &str = include_str!("patch_syntax.txt");
pub const ROUND_QUERY: &str = include_str!("round_query.txt");
pub const REVIEW_QUERY: &str = include_str!("review_query.txt");

/// Which diff encoding the model is asked to use for partial edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffSyntax {
    #[default]
    Diff,
    Patch,
}

impl DiffSyntax {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diff" | "search-replace" => Some(DiffSyntax::Diff),
            "patch" => Some(DiffSyntax::Patch),
            _ => None,
        }
    }

    fn edit_type(self) -> &'static str {
        match self {
            DiffSyntax::Diff => "DIFF",
            DiffSyntax::Patch => "PATCH",
        }
    }

    fn syntax_section(self) -> &'static str {
        match self {
            DiffSyntax::Diff => SEARCH_REPLACE_SYNTAX,
            DiffSyntax::Patch => PATCH_SYNTAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    Context,
    Review,
}

pub fn render_instructions(
    goal: &str,
    syntax: DiffSyntax,
    round: u32,
    kind: RoundKind,
    structure: &str,
) -> String {
    let query = match kind {
        RoundKind::Context => ROUND_QUERY,
        RoundKind::Review => REVIEW_QUERY,
    };
    let query = query.replace("{round}", &round.to_string());
    let format = RESPONSE_FORMAT.replace("{edit_type}", syntax.edit_type());

    format!(
        "{query}\n[goal]\n{goal}\n\n{format}\n{}\n[project structure]\n{structure}",
        syntax.syntax_section()
    )
}
