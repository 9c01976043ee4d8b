//! Route guard check.

use folio_session::SessionClient;
use folio_session::guards::GuardDecision;
use folio_session::navigation::Route;

pub fn enter(client: &SessionClient, name: &str) {
    let route = Route::parse(name);
    match client.enter(&route) {
        GuardDecision::Allow => println!("allowed: {route}"),
        GuardDecision::Redirect(target) => println!("redirected: {route} -> {target}"),
    }
}
