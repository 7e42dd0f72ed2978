//! Error types for building and solving an assignment model.

use thiserror::Error;

use crate::backend::SolveStatus;

#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The problem was rejected before any model was built.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("solver backend unavailable: {0}")]
    SolverUnavailable(String),

    /// The backend finished without a result we are allowed to use.
    /// `Infeasible` here points at a modeling bug, since every slot can
    /// always be marked unfilled.
    #[error("solver returned {status}")]
    SolverStatus { status: SolveStatus },
}

pub type AssignmentResult<T> = Result<T, AssignmentError>;
