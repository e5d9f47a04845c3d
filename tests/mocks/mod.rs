//! Mock infrastructure for testing external services
//!
//! This module provides wiremock servers for external dependencies:
//! - Supabase (auth and the PostgREST `profiles` table)
//! - OpenAI (chat completions and speech)

pub mod openai;
pub mod supabase;

pub use openai::*;
pub use supabase::*;
