//! Supabase integration module
//!
//! Provides the client for Supabase auth and the `profiles` table.

pub mod client;
pub mod models;

pub use client::SupabaseClient;
pub use models::*;
