// Navigation service - Use cases for moving and resizing the time window
use crate::application::error::{run_blocking, ServiceError};
use crate::application::session::Session;
use crate::application::tag_store::TagStore;
use crate::domain::window::{parse_time_frame, Step, TimeBounds};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct NavigationService {
    store: Arc<dyn TagStore>,
    clock: Clock,
}

impl NavigationService {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    pub fn with_clock(store: Arc<dyn TagStore>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub async fn step(&self, session: &mut Session, step: Step) -> Result<(), ServiceError> {
        let bounds = self.bounds().await?;
        let before = session.window.anchor();
        session.window.step(step, bounds, (self.clock)());
        tracing::info!(
            "Window {:?}: anchor {} -> {}",
            step,
            before,
            session.window.anchor()
        );
        Ok(())
    }

    /// Apply an operator time frame such as `"6 hours"`; the anchor is kept.
    pub fn set_time_frame(&self, session: &mut Session, text: &str) -> Result<(), ServiceError> {
        let minutes = parse_time_frame(text)?;
        self.set_duration(session, minutes)
    }

    pub fn set_duration(&self, session: &mut Session, minutes: f64) -> Result<(), ServiceError> {
        session.window.set_duration(minutes)?;
        tracing::info!("Window duration set to {} minutes", minutes);
        Ok(())
    }

    async fn bounds(&self) -> Result<TimeBounds, ServiceError> {
        let store = self.store.clone();
        run_blocking(move || store.bounds()?.ok_or(ServiceError::NoData)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::fixtures::at;
    use crate::domain::window::WindowError;
    use crate::infrastructure::memory_store::MemoryStore;

    fn service(now: i64) -> NavigationService {
        let store = MemoryStore::new();
        store.insert_rows(
            &["PI001"],
            vec![(at(0), vec![Some(1.0)]), (at(1000), vec![Some(2.0)])],
        );
        NavigationService::with_clock(Arc::new(store), Arc::new(move || at(now)))
    }

    #[tokio::test]
    async fn test_back_then_past_then_present() {
        let service = service(5000);
        let mut session = Session::new(at(500), 60.0).unwrap();

        service.step(&mut session, Step::Back).await.unwrap();
        assert_eq!(session.window.anchor(), at(440));

        service.step(&mut session, Step::Past).await.unwrap();
        assert_eq!(session.window.anchor(), at(60));

        service.step(&mut session, Step::Present).await.unwrap();
        assert_eq!(session.window.anchor(), at(1000));

        service.step(&mut session, Step::Forward).await.unwrap();
        assert_eq!(session.window.anchor(), at(1000));
    }

    #[tokio::test]
    async fn test_forward_clamps_to_wall_clock() {
        let service = service(530);
        let mut session = Session::new(at(500), 60.0).unwrap();
        service.step(&mut session, Step::Forward).await.unwrap();
        assert_eq!(session.window.anchor(), at(530));
    }

    #[tokio::test]
    async fn test_empty_store_has_no_bounds() {
        let service = NavigationService::new(Arc::new(MemoryStore::new()));
        let mut session = Session::new(at(500), 60.0).unwrap();
        let err = service.step(&mut session, Step::Back).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoData));
        assert_eq!(session.window.anchor(), at(500));
    }

    #[test]
    fn test_set_time_frame() {
        let service = service(0);
        let mut session = Session::new(at(500), 60.0).unwrap();
        service.set_time_frame(&mut session, "2 hours").unwrap();
        assert_eq!(session.window.duration_minutes(), 120.0);
        assert_eq!(session.window.anchor(), at(500));

        let err = service.set_time_frame(&mut session, "0 hours").unwrap_err();
        assert!(matches!(err, ServiceError::Window(WindowError::InvalidDuration(_))));
        let err = service.set_time_frame(&mut session, "soon").unwrap_err();
        assert!(matches!(err, ServiceError::Window(WindowError::InvalidTimeFrame(_))));
    }
}
