//! The three user-facing workflows: stage a new task, apply a pasted
//! response, and show where the current task stands.


use crate::app_error::AppError;
use crate::cli::ResponseSource;
use crate::config::{self, Config};
use crate::file_store::{DiskStore, FileStore};
use crate::logger::Logger;
use crate::rounds::{self, Advanced, NotActionable, Outcome, Task, TaskState};
use crate::staging::{FILES_DIR, INSTRUCTIONS_FILE};
use serde_json::json;
use std::fs;
use std::io::Read;
use std::path::Path;

const PASTE_HEADER: &str = "# Paste the model's response below this line, then save and quit.\n";

pub fn run_start(config: &Config, logger: &Logger) -> Result<(), AppError> {
    if !config::gitignore_protects_agent_config(&config.workspace_root) {
        println!(
            "Warning: .gitignore does not contain '/agent-config'. Staged copies of project files are kept there."
        );
    }

    println!("Collecting project files...");
    let task = rounds::start(config, &DiskStore)?;
    task.save(&DiskStore)?;
    logger.log_text("instructions.md", &task.last_instructions)?;

    let round = &task.current_round;
    println!(
        "Round {} staged with {} files in {}",
        round.index,
        round.files.len(),
        round.directory.display()
    );
    print_send_hint(&round.directory);
    Ok(())
}

pub fn run_apply(config: &Config, source: &ResponseSource, logger: &Logger) -> Result<(), AppError> {
    run_apply_with_store(config, source, logger, &DiskStore)
}

fn run_apply_with_store(
    config: &Config,
    source: &ResponseSource,
    logger: &Logger,
    store: &dyn FileStore,
) -> Result<(), AppError> {
    let mut task = Task::load(&config.staging_root, store)?;
    task.review_round &= config.review_round;

    let response = read_response(source)?;
    logger.log_text("response.txt", &response)?;

    println!("Parsing response for round {}...", task.current_round.index);
    let advanced = rounds::advance(&task, &response, store)?;
    logger.log_json("change-set.json", &serde_json::to_value(&advanced.change_set)?)?;

    report_outcome(&advanced, logger)?;
    advanced.task.save(store)?;
    Ok(())
}

pub fn run_status(config: &Config) -> Result<(), AppError> {
    let task = Task::load(&config.staging_root, &DiskStore)?;
    println!("{}", describe_task(&task));
    Ok(())
}

fn describe_task(task: &Task) -> String {
    let state = match task.state {
        TaskState::AwaitingFirstResponse => "awaiting the first response",
        TaskState::AwaitingFollowUp => "awaiting a follow-up response",
        TaskState::Completed => "completed",
    };
    let round = &task.current_round;
    let kind = if round.review { " (review)" } else { "" };
    format!(
        "Goal: {}\nState: {state}\nRound {}{kind}: {} files in {}\nStarted round at: {}",
        task.goal,
        round.index,
        round.files.len(),
        round.directory.display(),
        round.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn print_send_hint(round_dir: &Path) {
    println!(
        "Send {} and the files under {} to the model, then run with --apply.",
        round_dir.join(INSTRUCTIONS_FILE).display(),
        round_dir.join(FILES_DIR).display()
    );
}

fn read_response(source: &ResponseSource) -> Result<String, AppError> {
    match source {
        ResponseSource::Editor => config::read_from_editor(PASTE_HEADER),
        ResponseSource::Stdin => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        ResponseSource::File(path) => fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read response file '{}': {}",
                path.display(),
                e
            ))
        }),
    }
}

fn report_outcome(advanced: &Advanced, logger: &Logger) -> Result<(), AppError> {
    let change_set = &advanced.change_set;
    if let Some(reasoning) = &change_set.reasoning {
        println!("\nModel reasoning:\n---\n{reasoning}\n---\n");
    }
    if change_set.dropped_edits > 0 {
        println!(
            "Warning: {} code change(s) had an unknown type or no file path and were ignored.",
            change_set.dropped_edits
        );
    }

    match &advanced.outcome {
        Outcome::Applied(summary) => {
            for warning in &summary.manifest.warnings {
                println!("Warning: {warning}");
            }
            for path in &summary.report.written {
                println!("  - Wrote {}", path.display());
            }
            for path in &summary.report.unchanged {
                println!("  - Unchanged {}", path.display());
            }
            for failure in &summary.report.failures {
                eprintln!("  - Failed to write {}: {}", failure.path.display(), failure.message);
            }
            println!(
                "Applied edits to {} of {} files.",
                summary.report.written.len(),
                summary.manifest.files.len()
            );
            if let Some(review) = &summary.review_round {
                println!(
                    "Review round {} staged in {}",
                    review.index,
                    review.directory.display()
                );
            }
            logger.log_json(
                "apply-report.json",
                &json!({
                    "warnings": summary.manifest.warnings,
                    "report": summary.report,
                }),
            )?;
        }
        Outcome::RoundStaged(round) => {
            println!(
                "The model asked for more context. Round {} staged with {} files in {}",
                round.index,
                round.files.len(),
                round.directory.display()
            );
            print_send_hint(&round.directory);
        }
        Outcome::NotActionable(NotActionable::UnknownStatus) => {
            println!(
                "Warning: the response status was missing or not recognized (expected COMPLETED or NEED_CONTEXT). No changes were made."
            );
        }
        Outcome::NotActionable(NotActionable::EmptyChangeSet { warnings }) => {
            for warning in warnings {
                println!("Warning: {warning}");
            }
            println!("Warning: the response was COMPLETED but contained no usable edits. No changes were made.");
        }
    }
    Ok(())
}
