// Per-session state: plotted tags and the active time window
use crate::domain::tag::TagId;
use crate::domain::window::{TimeWindow, WindowError};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Session {
    pub plotted: Vec<TagId>,
    pub window: TimeWindow,
}

impl Session {
    pub fn new(now: DateTime<Utc>, duration_minutes: f64) -> Result<Self, WindowError> {
        Ok(Self {
            plotted: Vec::new(),
            window: TimeWindow::new(now, duration_minutes)?,
        })
    }

    /// Add a tag to the plot list; returns false if it was already plotted.
    pub fn plot(&mut self, tag: TagId) -> bool {
        if self.plotted.contains(&tag) {
            return false;
        }
        self.plotted.push(tag);
        true
    }

    /// Remove a tag from the plot list; returns false if it was not plotted.
    pub fn unplot(&mut self, tag: &TagId) -> bool {
        let before = self.plotted.len();
        self.plotted.retain(|t| t != tag);
        self.plotted.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::fixtures::at;

    #[test]
    fn test_plot_list_has_no_repeats() {
        let mut session = Session::new(at(0), 60.0).unwrap();
        let pi = TagId::parse("PI001").unwrap();
        assert!(session.plot(pi.clone()));
        assert!(!session.plot(pi.clone()));
        assert_eq!(session.plotted.len(), 1);
        assert!(session.unplot(&pi));
        assert!(!session.unplot(&pi));
    }

    #[test]
    fn test_new_session_window() {
        let session = Session::new(at(120), 60.0).unwrap();
        assert_eq!(session.window.anchor(), at(120));
        assert_eq!(session.window.start(), at(60));
        assert!(Session::new(at(0), -1.0).is_err());
    }
}
