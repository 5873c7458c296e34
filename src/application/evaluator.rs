// Formula evaluator
//
// Walks the syntax tree once. Every tag reference queries the provider over
// the same borrowed window, so all fetches in one evaluation share a range.
use crate::application::tag_store::{SeriesProvider, StoreError};
use crate::domain::formula::Expr;
use crate::domain::formula::functions::{Function, FunctionError};
use crate::domain::tag::{InvalidTagId, TagId};
use crate::domain::value::{MisalignedSeries, Value};
use crate::domain::window::TimeWindow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    InvalidTagId(#[from] InvalidTagId),
    #[error("unknown tag '{0}'")]
    UnknownTag(String),
    #[error(transparent)]
    Misaligned(#[from] MisalignedSeries),
    #[error(transparent)]
    Function(#[from] FunctionError),
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl From<StoreError> for EvalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTagId(e) => EvalError::InvalidTagId(e),
            StoreError::UnknownTag(id) => EvalError::UnknownTag(id),
            StoreError::Backend(e) => EvalError::Store(e),
        }
    }
}

pub fn evaluate<P>(expr: &Expr, window: &TimeWindow, provider: &P) -> Result<Value, EvalError>
where
    P: SeriesProvider + ?Sized,
{
    match expr {
        Expr::Literal(n) => Ok(Value::scalar(*n)),
        Expr::TagRef(id) => {
            let tag = TagId::parse(id)?;
            let series = provider.fetch(&tag, window.range())?;
            tracing::debug!("Fetched {} samples for {}", series.len(), tag);
            Ok(Value::Series(series))
        }
        Expr::Binary { op, left, right } => {
            let lhs = evaluate(left, window, provider)?;
            let rhs = evaluate(right, window, provider)?;
            Ok(lhs.apply(*op, &rhs)?)
        }
        Expr::Call { name, args } => {
            // Arguments are evaluated before the name is resolved.
            let values = args
                .iter()
                .map(|arg| evaluate(arg, window, provider))
                .collect::<Result<Vec<_>, _>>()?;
            let function = Function::lookup(name)?;
            Ok(function.call(values)?)
        }
    }
}
