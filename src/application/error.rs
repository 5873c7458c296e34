// Errors surfaced by the application services
use crate::application::evaluator::EvalError;
use crate::application::tag_store::StoreError;
use crate::domain::formula::SyntaxError;
use crate::domain::tag::{InvalidTagId, TagId};
use crate::domain::window::WindowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    InvalidTagId(#[from] InvalidTagId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("formula produced a {0}; only series can be stored as a tag")]
    NotASeries(&'static str),
    #[error("tag '{0}' already exists")]
    TagExists(TagId),
    #[error("the store holds no samples")]
    NoData,
    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

/// Run store-bound work on the blocking pool as a single unit.
pub async fn run_blocking<T, F>(work: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("blocking task failed: {e}")))?
}
