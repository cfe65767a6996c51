use snafu::prelude::*;

use crate::errors::IndexError;
use crate::IStr;

/// Error type for store lifecycle and backend read operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("store is closed; reopen it or access it with autoclose"))]
    StoreClosed,

    #[snafu(display("failed to open store at '{path}': {msg}"))]
    OpenFailed { path: String, msg: String },

    #[snafu(display("variable not found: {name}"))]
    VariableNotFound { name: IStr },

    #[snafu(display("failed to read variable '{name}': {msg}"))]
    ReadFailed { name: IStr, msg: String },

    #[snafu(display("expected a scalar result but the selection has shape {shape:?}"))]
    NotAScalar { shape: Vec<u64> },

    #[snafu(context(false))]
    Index { source: IndexError },

    #[snafu(display("{msg}"))]
    Other { msg: String },
}

impl BackendError {
    pub fn other(msg: impl Into<String>) -> BackendError {
        BackendError::Other { msg: msg.into() }
    }

    pub fn open_failed(path: impl Into<String>, msg: impl Into<String>) -> BackendError {
        BackendError::OpenFailed { path: path.into(), msg: msg.into() }
    }

    pub fn read_failed(name: IStr, msg: impl Into<String>) -> BackendError {
        BackendError::ReadFailed { name, msg: msg.into() }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
