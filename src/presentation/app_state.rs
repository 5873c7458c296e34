// Application state for HTTP handlers
use crate::application::formula_service::FormulaService;
use crate::application::navigation_service::NavigationService;
use crate::application::session::Session;
use tokio::sync::Mutex;

pub struct AppState {
    pub formula_service: FormulaService,
    pub navigation_service: NavigationService,
    /// Held for the whole request so the window cannot move mid-evaluation.
    pub session: Mutex<Session>,
}
