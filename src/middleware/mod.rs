//! Actix middleware.

mod request_logger;
mod session_guard;

pub use request_logger::RequestLogger;
pub use session_guard::{LOGIN_PAGE, REFRESH_ROUTE, SessionGuard, is_public_route};
