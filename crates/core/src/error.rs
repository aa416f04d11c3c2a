use std::result::Result as StdResult;

use thiserror::Error;

use crate::WorkflowStatus;

/// Errors raised by domain invariants in ora2pg-assist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("workflow status cannot move from {from} to {to}")]
    InvalidTransition { from: WorkflowStatus, to: WorkflowStatus },

    #[error("session {0} is already finalized")]
    SessionFinalized(String),

    #[error("processed objects would exceed total ({total})")]
    ProcessedOverflow { total: u32 },

    #[error("total objects is already fixed at {0}")]
    TotalAlreadyFixed(u32),
}

pub type Result<T> = StdResult<T, CoreError>;
