//! Core use-case services.
//!
//! # Responsibility
//! - Pair every local mutation with its durable sync-queue entry.
//! - Keep in-memory stores decoupled from storage and queue details.

pub mod local_actions;
