// ABOUTME: Library root for deckhand - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod behaviours;
pub mod config;
pub mod deployment;
pub mod diagnostics;
pub mod error;
pub mod extraction;
pub mod fs;
pub mod journal;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod scripts;
pub mod semaphore;
pub mod variables;
