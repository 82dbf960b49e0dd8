use thiserror::Error;

use crate::core::solver::SolveError;

/// Rejections raised while turning CLI flags or request payloads into engine
/// inputs. Messages name the CLI flag so both surfaces share wording.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{flag} must be a finite number")]
    NonFinite { flag: &'static str },
    #[error("{flag} must be >= 0")]
    Negative { flag: &'static str },
    #[error("--annual-rate must be > -100")]
    RateTooLow,
    #[error("--tenure-years must be between 1 and {max}")]
    TenureOutOfRange { max: u32 },
    #[error("--defer-years must be <= --tenure-years")]
    DeferExceedsTenure,
    #[error("--goal is required to solve")]
    MissingGoal,
    #[error(transparent)]
    Solve(#[from] SolveError),
}
