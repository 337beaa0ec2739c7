//! # Storage Module
//!
//! Durable state for the authentication server: registered identities and
//! their outstanding login challenges.
//!
//! Session tokens are stateless and never stored. Credentials exist only
//! in transit.

pub mod db;

pub use db::{AuthDb, DbError, DbResult, StoredChallenge};
