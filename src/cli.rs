use crate::app_error::AppError;
use crate::system_prompts::DiffSyntax;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workflow {
    #[default]
    Status,
    Start,
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseSource {
    /// Paste the response into `$EDITOR`.
    #[default]
    Editor,
    Stdin,
    File(PathBuf),
}

#[derive(Debug, PartialEq)]
pub struct CliArgs {
    pub workflow: Workflow,
    pub root: Option<PathBuf>,
    pub goal: Option<String>,
    pub response: ResponseSource,
    pub diff_syntax: Option<DiffSyntax>,
    pub review_round: bool,
}

pub fn parse_cli_args() -> Result<CliArgs, AppError> {
    parse_args(std::env::args().skip(1))
}

pub fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, AppError> {
    let mut workflow: Option<Workflow> = None;
    let mut root = None;
    let mut goal = None;
    let mut response = ResponseSource::default();
    let mut diff_syntax = None;
    let mut review_round = true;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--start" | "--apply" | "--status" => {
                if workflow.is_some() {
                    return Err(AppError::Config(
                        "It is an error to trigger more than one workflow at a time.".to_string(),
                    ));
                }
                workflow = Some(match arg.as_str() {
                    "--start" => Workflow::Start,
                    "--apply" => Workflow::Apply,
                    _ => Workflow::Status,
                });
            }
            "--root" => root = Some(PathBuf::from(value_for(&arg, &mut args)?)),
            "--goal" => goal = Some(value_for(&arg, &mut args)?),
            "--response" => {
                let value = value_for(&arg, &mut args)?;
                response = if value == "-" {
                    ResponseSource::Stdin
                } else {
                    ResponseSource::File(PathBuf::from(value))
                };
            }
            "--diff-syntax" => {
                let value = value_for(&arg, &mut args)?;
                diff_syntax = Some(DiffSyntax::from_str(&value).ok_or_else(|| {
                    AppError::Config(format!("Unsupported diff syntax: {value}"))
                })?);
            }
            "--no-review" => review_round = false,
            _ => {
                return Err(AppError::Config(format!("Unknown argument: {arg}")));
            }
        }
    }

    Ok(CliArgs {
        workflow: workflow.unwrap_or_default(),
        root,
        goal,
        response,
        diff_syntax,
        review_round,
    })
}

fn value_for(flag: &str, args: &mut impl Iterator<Item = String>) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::Config(format!("Missing value for {flag} argument")))
}
