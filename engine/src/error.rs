//! Engine error types

use lotto_core::{CoreError, SourceError};
use lotto_storage::StorageError;
use thiserror::Error;

use crate::presenter::PresenterError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Nothing irreversible was committed by the failing step
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("Presenter error: {0}")]
    Presenter(#[from] PresenterError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Engine is not running")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, EngineError>;
