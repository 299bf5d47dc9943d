//! Ad Inline Bot Library
//!
//! Answers free-text category queries with pre-authored ads.
//!
//! This crate provides the core functionality for:
//! - Debouncing bursts of queries per user on a shared heartbeat
//! - Resolving free text to a known category by fuzzy matching
//! - Parsing category sheets into ads, skipping malformed rows
//! - Building inline answers and handling admin commands

pub mod ads;
pub mod commands;
pub mod config;
pub mod debounce;
pub mod heartbeat;
pub mod inline;
