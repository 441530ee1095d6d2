use crate::app_error::AppError;
use crate::cli::{CliArgs, Workflow};
use crate::system_prompts::DiffSyntax;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;


pub const AGENT_CONFIG_DIR: &str = "agent-config";
const PROJECT_FILE: &str = "patchbay.json";
const DEFAULT_MAX_FILE_BYTES: u64 = 256 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_root: PathBuf,
    pub staging_root: PathBuf,
    pub log_root: PathBuf,
    pub goal: String,
    pub diff_syntax: DiffSyntax,
    pub review_round: bool,
    pub ignore: Vec<String>,
    pub max_file_bytes: u64,
}

/// Optional `agent-config/patchbay.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProjectFile {
    diff_syntax: Option<DiffSyntax>,
    review_round: Option<bool>,
    ignore: Vec<String>,
    max_file_bytes: Option<u64>,
}

impl Config {
    pub fn load(args: &CliArgs) -> Result<Self, AppError> {
        let base_dir = args.root.clone().unwrap_or_else(|| PathBuf::from("."));
        let goal = match (args.workflow, &args.goal) {
            (Workflow::Start, Some(goal)) => goal.clone(),
            (Workflow::Start, None) => read_from_editor("# Describe the goal for this task.\n")?,
            _ => String::new(),
        };

        Self::load_from_dir(args, &base_dir, goal)
    }

    pub fn load_from_dir(args: &CliArgs, base_dir: &Path, goal: String) -> Result<Self, AppError> {
        if !base_dir.is_dir() {
            return Err(AppError::Config(format!(
                "Project root '{}' is not a directory.",
                base_dir.display()
            )));
        }
        if args.workflow == Workflow::Start && goal.trim().is_empty() {
            return Err(AppError::Config(
                "The goal is empty. Pass --goal or write it in the editor.".to_string(),
            ));
        }

        let project = read_project_file(base_dir)?;
        let agent_dir = base_dir.join(AGENT_CONFIG_DIR);

        Ok(Self {
            workspace_root: base_dir.to_path_buf(),
            staging_root: agent_dir.join("rounds"),
            log_root: agent_dir.join("logs"),
            goal: goal.trim().to_string(),
            diff_syntax: args
                .diff_syntax
                .or(project.diff_syntax)
                .unwrap_or_default(),
            review_round: args.review_round && project.review_round.unwrap_or(true),
            ignore: project.ignore,
            max_file_bytes: project.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES),
        })
    }
}

fn read_project_file(base_dir: &Path) -> Result<ProjectFile, AppError> {
    let rel_path = Path::new(AGENT_CONFIG_DIR).join(PROJECT_FILE);
    let content = match fs::read_to_string(base_dir.join(&rel_path)) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProjectFile::default()),
        Err(e) => {
            return Err(AppError::Config(format!(
                "Failed to read file '{}': {}",
                rel_path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&content).map_err(|e| {
        AppError::Config(format!("Invalid '{}': {}", rel_path.display(), e))
    })
}

/// Staged copies of project files live under `agent-config/`, so it should
/// never be committed.
pub fn gitignore_protects_agent_config(base_dir: &Path) -> bool {
    let Ok(content) = fs::read_to_string(base_dir.join(".gitignore")) else {
        return false;
    };
    content.lines().any(|line| {
        let trimmed = line.trim();
        trimmed == "/agent-config" || trimmed == "agent-config/" || trimmed == "/agent-config/"
    })
}

/// Opens `$VISUAL`/`$EDITOR` on a temporary file seeded with `header` and
/// returns what the user saved, with `#` comment lines from the header removed.
pub(crate) fn read_from_editor(header: &str) -> Result<String, AppError> {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());

    let file = tempfile::Builder::new()
        .suffix(".md")
        .tempfile()
        .map_err(AppError::Io)?;
    let file_path = file.path();
    fs::write(file_path, header)?;

    let status = Command::new(&editor)
        .arg(file_path)
        .status()
        .map_err(|e| AppError::Config(format!("Failed to launch editor '{editor}': {e}")))?;

    if !status.success() {
        return Err(AppError::Config(
            "Editor exited with non-zero status.".to_string(),
        ));
    }

    let mut buffer = String::new();
    // Open file path freshly to handle atomic saves by editors
    let mut f = fs::File::open(file_path).map_err(AppError::Io)?;
    f.read_to_string(&mut buffer).map_err(AppError::Io)?;

    Ok(strip_header(&buffer, header))
}

fn strip_header(text: &str, header: &str) -> String {
    let header_lines: Vec<&str> = header.lines().collect();
    text.lines()
        .filter(|line| !header_lines.contains(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
