//! Course Admin Server library.
//!
//! Courses, departments and users over a Hasura GraphQL backend, with cookie-based
//! sessions, transparent refresh-token rotation and avatar storage.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
