//! The round coordinator: a task's state machine across request/response
//! rounds.
//!
//! ```text
//! start ──> AwaitingFirstResponse ──NEED_CONTEXT──> AwaitingFollowUp ─┐
//!                 │                                      ^            │
//!                 │                                      └────────────┘
//!                 └───────────COMPLETED────────────> Completed
//! ```
//!
//! An unknown status leaves the task as it was. Nothing rejects a response
//! after `Completed`; the caller decides whether to keep going.


use crate::app_error::AppError;
use crate::config::Config;
use crate::edit_applier::{self, ApplyWarning, Manifest, WriteReport};
use crate::file_store::{FileStore, PathProtection};
use crate::response_parser::{self, ChangeSet, Status};
use crate::staging::{self, RoundContents, WalkOptions, STRUCTURE_FILE};
use crate::system_prompts::{render_instructions, DiffSyntax, RoundKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub(crate) const TASK_FILE: &str = "task.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum TaskState {
    AwaitingFirstResponse,
    AwaitingFollowUp,
    Completed,
}

/// One staged generation of files. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Round {
    pub index: u32,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub review: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Task {
    pub goal: String,
    pub workspace_root: PathBuf,
    pub staging_root: PathBuf,
    pub diff_syntax: DiffSyntax,
    pub review_round: bool,
    pub state: TaskState,
    pub current_round: Round,
    pub last_instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NotActionable {
    UnknownStatus,
    /// `COMPLETED` with no edit that could be applied. Carries the reasons
    /// edits were refused, if any.
    EmptyChangeSet { warnings: Vec<ApplyWarning> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApplySummary {
    pub manifest: Manifest,
    pub report: WriteReport,
    pub review_round: Option<Round>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Applied(ApplySummary),
    RoundStaged(Round),
    NotActionable(NotActionable),
}

#[derive(Debug)]
pub(crate) struct Advanced {
    pub task: Task,
    pub change_set: ChangeSet,
    pub outcome: Outcome,
}

/// Walks the project, stages round 1, and returns a fresh task. Any earlier
/// task in the same staging root is discarded wholesale.
pub(crate) fn start(config: &Config, store: &dyn FileStore) -> Result<Task, AppError> {
    staging::reset(&config.staging_root, TASK_FILE)?;

    let files = staging::collect_files(
        &config.workspace_root,
        &WalkOptions {
            ignore_globs: &config.ignore,
            max_file_bytes: config.max_file_bytes,
        },
    )?;
    let structure = staging::render_structure(&files);
    let instructions = render_instructions(
        &config.goal,
        config.diff_syntax,
        1,
        RoundKind::Context,
        &structure,
    );

    let directory = staging::round_directory(&config.staging_root, 1);
    let staged = staging::stage_round(
        store,
        &config.workspace_root,
        &directory,
        &RoundContents {
            files: &files,
            structure: Some(&structure),
            instructions: &instructions,
        },
    )?;

    Ok(Task {
        goal: config.goal.clone(),
        workspace_root: config.workspace_root.clone(),
        staging_root: config.staging_root.clone(),
        diff_syntax: config.diff_syntax,
        review_round: config.review_round,
        state: TaskState::AwaitingFirstResponse,
        current_round: new_round(1, directory, staged, false),
        last_instructions: instructions,
    })
}

/// Parses `response` and advances the task. Fails only when no JSON can be
/// extracted; everything else is reported through [`Outcome`].
pub(crate) fn advance(
    task: &Task,
    response: &str,
    store: &dyn FileStore,
) -> Result<Advanced, AppError> {
    let change_set = response_parser::parse_response(response)?;
    let (task, outcome) = advance_with(task, &change_set, store)?;
    Ok(Advanced {
        task,
        change_set,
        outcome,
    })
}

pub(crate) fn advance_with(
    task: &Task,
    change_set: &ChangeSet,
    store: &dyn FileStore,
) -> Result<(Task, Outcome), AppError> {
    match change_set.status {
        Status::Completed => complete(task, change_set, store),
        Status::NeedsContext => request_context(task, change_set, store),
        Status::Unknown => Ok((
            task.clone(),
            Outcome::NotActionable(NotActionable::UnknownStatus),
        )),
    }
}

fn complete(
    task: &Task,
    change_set: &ChangeSet,
    store: &dyn FileStore,
) -> Result<(Task, Outcome), AppError> {
    let protection = PathProtection::new_for_base_dir(&task.workspace_root)?;
    let (edits, mut warnings) = edit_applier::partition_safe(&change_set.edits, &protection);
    if edits.is_empty() {
        return Ok((
            task.clone(),
            Outcome::NotActionable(NotActionable::EmptyChangeSet { warnings }),
        ));
    }

    let root = &task.workspace_root;
    let mut manifest = edit_applier::apply_all(&edits, |path| store.read(&root.join(path)));
    warnings.append(&mut manifest.warnings);
    manifest.warnings = warnings;
    let report = edit_applier::write_manifest(&manifest, root, store);

    let mut next = task.clone();
    next.state = TaskState::Completed;

    let review_round = if task.review_round && !report.written.is_empty() {
        let (round, instructions) =
            stage_next_round(task, &report.written, RoundKind::Review, store)?;
        next.current_round = round.clone();
        next.last_instructions = instructions;
        Some(round)
    } else {
        None
    };

    Ok((
        next,
        Outcome::Applied(ApplySummary {
            manifest,
            report,
            review_round,
        }),
    ))
}

fn request_context(
    task: &Task,
    change_set: &ChangeSet,
    store: &dyn FileStore,
) -> Result<(Task, Outcome), AppError> {
    let protection = PathProtection::new_for_base_dir(&task.workspace_root)?;

    // Unsafe or missing paths are skipped without comment.
    let mut files: Vec<PathBuf> = Vec::new();
    for requested in &change_set.requested_files {
        let Ok(cleaned) = protection.validate(requested) else {
            continue;
        };
        if store.exists(&task.workspace_root.join(&cleaned)) && !files.contains(&cleaned) {
            files.push(cleaned);
        }
    }

    let (round, instructions) = stage_next_round(task, &files, RoundKind::Context, store)?;

    let mut next = task.clone();
    next.state = TaskState::AwaitingFollowUp;
    next.current_round = round.clone();
    next.last_instructions = instructions;

    Ok((next, Outcome::RoundStaged(round)))
}

/// Stages round N+1 with `files`, carrying over the previous round's
/// structure listing when there is one.
fn stage_next_round(
    task: &Task,
    files: &[PathBuf],
    kind: RoundKind,
    store: &dyn FileStore,
) -> Result<(Round, String), AppError> {
    let index = task.current_round.index + 1;
    let structure = store.read(&task.current_round.directory.join(STRUCTURE_FILE))?;
    let instructions = render_instructions(
        &task.goal,
        task.diff_syntax,
        index,
        kind,
        structure.as_deref().unwrap_or_default(),
    );

    let directory = staging::round_directory(&task.staging_root, index);
    let staged = staging::stage_round(
        store,
        &task.workspace_root,
        &directory,
        &RoundContents {
            files,
            structure: structure.as_deref(),
            instructions: &instructions,
        },
    )?;

    let round = new_round(index, directory, staged, kind == RoundKind::Review);
    Ok((round, instructions))
}

fn new_round(index: u32, directory: PathBuf, files: Vec<PathBuf>, review: bool) -> Round {
    Round {
        index,
        directory,
        files,
        created_at: Utc::now(),
        review,
    }
}

impl Task {
    pub(crate) fn save(&self, store: &dyn FileStore) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)?;
        store.write(&self.staging_root.join(TASK_FILE), &json)
    }

    pub(crate) fn load(staging_root: &Path, store: &dyn FileStore) -> Result<Self, AppError> {
        let content = store
            .read(&staging_root.join(TASK_FILE))?
            .ok_or_else(|| AppError::NoActiveTask(staging_root.to_path_buf()))?;
        Ok(serde_json::from_str(&content)?)
    }
}
