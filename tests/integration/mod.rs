//! Integration tests for the Cartomante API
//!
//! These tests drive the real router through authentication, the quota
//! gate, sessions and the webhook receiver against mocked upstreams.

mod health;
mod speech;
mod supabase_store;
mod usage;
mod webhook;
