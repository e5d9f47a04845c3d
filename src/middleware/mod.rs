//! Middleware module
//!
//! Contains Tower middleware for authentication and the trial quota gate.

pub mod auth;
pub mod quota;
