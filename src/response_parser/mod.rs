//! Turns a free-form model response into a canonical [`ChangeSet`].
//!
//! Extraction happens in two stages: the normalizer pulls the most plausible
//! JSON value out of the surrounding text, then the change-set parser coerces
//! whichever historical shape that value has into the canonical model.

mod change_set;
mod normalizer;


pub(crate) use change_set::{parse_change_set, ChangeSet, Edit, EditKind, Status};

use crate::app_error::AppError;

pub(crate) fn parse_response(text: &str) -> Result<ChangeSet, AppError> {
    let value = normalizer::normalize(text)?;
    Ok(parse_change_set(value))
}
