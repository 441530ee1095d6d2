mod app_error;
mod cli;
mod config;
mod edit_applier;
mod file_store;
mod logger;
mod patch_engine;
mod response_parser;
mod rounds;
mod staging;
mod system_prompts;
mod workflow;


use crate::app_error::AppError;
use crate::cli::Workflow;
use crate::config::Config;
use std::process::exit;

fn main() {
    let result = run();

    match result {
        Ok(_) => exit(0),
        Err(e) => {
            eprintln!("An error occurred: {e}");
            exit(1);
        }
    }
}

fn run() -> Result<(), AppError> {
    let cli_args = cli::parse_cli_args()?;
    let config = Config::load(&cli_args)?;

    let logger_suffix = match cli_args.workflow {
        Workflow::Status => return workflow::run_status(&config),
        Workflow::Start => "start",
        Workflow::Apply => "apply",
    };
    let logger = logger::Logger::new_with_root(&config.log_root, logger_suffix)?;

    let result = match cli_args.workflow {
        Workflow::Start => workflow::run_start(&config, &logger),
        Workflow::Apply => workflow::run_apply(&config, &cli_args.response, &logger),
        Workflow::Status => Ok(()),
    };

    if let Err(e) = &result {
        let _ = logger.log_text("final_error.txt", &e.to_string());
    }

    result
}
