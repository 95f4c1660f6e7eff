//! API E2E test suite.
//!
//! Drives the real routes and middleware with `actix_web::test`, replacing the Hasura
//! backend and object storage with recording in-memory doubles.
//!
//! Run with: cargo test --test api_e2e

mod mock_graphql;
mod mock_storage;
mod test_helpers;

mod test_departments;
mod test_session_guard;
