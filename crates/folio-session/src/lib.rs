//! Bearer-token session lifecycle for the Folio reporting client.
//!
//! Owns the token, decodes its claims, refreshes it when a protected call is
//! rejected as expired (one refresh shared by every concurrent caller) and
//! gates navigation on session presence.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guards;
pub mod interceptor;
pub mod navigation;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod token;
pub mod transport;

pub use client::SessionClient;
pub use error::{LoginError, RefreshError, SessionError};
pub use session::SessionContext;
pub use session::effects::{BootstrapOutcome, SessionEffects};
pub use session::state::SessionState;
pub use session::store::SessionStore;
