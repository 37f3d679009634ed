//! REST E2E test suite.
//!
//! Drives the PostgREST store and the auth client over real HTTP against an
//! in-process mock backend. No external services are needed.
//!
//! Run with: cargo test --test rest_e2e

mod test_helpers;

mod test_auth;
mod test_store;
