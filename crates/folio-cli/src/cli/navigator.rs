use folio_session::navigation::{Navigator, Notice, Route};

/// Reports navigation and notices on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNavigator;

impl Navigator for StderrNavigator {
    fn navigate(&self, route: &Route) {
        tracing::debug!(%route, "navigate");
        eprintln!("→ {route}");
    }

    fn notify(&self, notice: Notice) {
        eprintln!("! {notice}");
    }
}
