//! League portal client core.
//!
//! Session and role resolution over a hosted backend (PostgREST store plus
//! an OAuth identity provider), the mutate-then-reconcile protocol used by
//! every panel action, and view models for the portal's pages.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod views;
