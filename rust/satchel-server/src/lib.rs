//! The Satchel HTTP server.
//!
//! Logged-in users (bearer tokens, see [auth]) upload files and manage share
//! links; anyone holding a share link resolves it under `/s/{id}`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
