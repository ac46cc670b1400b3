//! Marketstall storefront library.
//!
//! Catalog browsing, a persisted cart, checkout and accounts on top of a
//! hosted document store and auth service. Every outside collaborator sits
//! behind a trait with an in-memory and an HTTP adapter:
//!
//! - [`gateway::DocumentStore`] - documents by collection and id
//! - [`auth::AuthGateway`] - sign-up, sign-in, session changes
//! - [`storage::DeviceStorage`] - device-local key/value strings
//!
//! [`state::AppState`] wires them to the services and views.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod gateway;
pub mod services;
pub mod state;
pub mod storage;
#[cfg(test)]
mod test_support;
pub mod views;

pub use error::{AppError, Result};
pub use state::{AppState, Backends};
