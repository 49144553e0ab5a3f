//! Integration tests for statarb-bot.
//!
//! These tests verify the interaction between components:
//! - WebSocket connector lifecycle against a scripted server
//! - Trade frames flowing into the tick store
//! - Pair analytics over ingested ticks

pub mod common;
