// Formula service - Use cases for plotting tags and evaluating formulas
use crate::application::error::{run_blocking, ServiceError};
use crate::application::evaluator::evaluate;
use crate::application::session::Session;
use crate::application::tag_store::{StoreError, TagStore};
use crate::domain::formula::parse;
use crate::domain::tag::{Tag, TagId};
use crate::domain::value::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct FormulaService {
    store: Arc<dyn TagStore>,
}

impl FormulaService {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    /// Add a tag to the session's plot list and return the refreshed chart.
    /// The tag must exist in the store; nothing is added otherwise.
    pub async fn plot_tag(&self, session: &mut Session, raw_id: &str) -> Result<Vec<Tag>, ServiceError> {
        let tag = TagId::normalize(raw_id)?;
        let store = self.store.clone();
        let range = session.window.range();
        let id = tag.clone();
        run_blocking(move || Ok(store.fetch(&id, range).map(|_| ())?)).await?;

        if !session.plot(tag.clone()) {
            tracing::debug!("Tag {} already plotted", tag);
        }
        self.chart(session).await
    }

    pub fn remove_tag(&self, session: &mut Session, raw_id: &str) -> Result<bool, ServiceError> {
        let tag = TagId::normalize(raw_id)?;
        Ok(session.unplot(&tag))
    }

    /// Fetch every plotted tag over the session's current window.
    pub async fn chart(&self, session: &Session) -> Result<Vec<Tag>, ServiceError> {
        let store = self.store.clone();
        let tags = session.plotted.clone();
        let range = session.window.range();

        run_blocking(move || {
            tags.into_iter()
                .map(|id| -> Result<Tag, ServiceError> {
                    let series = store.fetch(&id, range)?;
                    Ok(Tag::new(id, Value::Series(series)))
                })
                .collect()
        })
        .await
    }

    pub async fn evaluate(&self, session: &Session, formula: &str) -> Result<Value, ServiceError> {
        let expr = parse(formula)?;
        tracing::debug!("Evaluating {} (tags: {:?})", expr, expr.tag_refs());

        let store = self.store.clone();
        let window = session.window.clone();
        let value = run_blocking(move || Ok(evaluate(&expr, &window, store.as_ref())?)).await?;

        tracing::info!("Formula '{}' evaluated to a {}", formula, value.kind());
        Ok(value)
    }

    /// Evaluate `formula`, store the resulting series as `raw_name` and plot it.
    pub async fn create_derived_tag(
        &self,
        session: &mut Session,
        raw_name: &str,
        formula: &str,
    ) -> Result<Tag, ServiceError> {
        let name = TagId::normalize(raw_name)?;
        self.ensure_new_tag(&name, session).await?;
        let value = self.evaluate(session, formula).await?;
        let kind = value.kind();
        let Value::Series(series) = value else {
            return Err(ServiceError::NotASeries(kind));
        };
        if series.is_empty() {
            tracing::warn!("Derived tag {} has no samples in the current window", name);
        }

        let store = self.store.clone();
        let id = name.clone();
        let series = run_blocking(move || {
            store.write_tag(&id, &series)?;
            Ok(series)
        })
        .await?;

        session.plot(name.clone());
        Ok(Tag::new(name, Value::Series(series)))
    }

    /// Derived tags only ever add columns; stored data is never replaced.
    async fn ensure_new_tag(&self, name: &TagId, session: &Session) -> Result<(), ServiceError> {
        let store = self.store.clone();
        let id = name.clone();
        let range = session.window.range();
        run_blocking(move || match store.fetch(&id, range) {
            Ok(_) => Err(ServiceError::TagExists(id)),
            Err(StoreError::UnknownTag(_)) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}
