//! Integration tests for nl-orchestrator
//!
//! These tests drive the agent end to end: splitting, classification,
//! planning, execution against real tools, normalization and history.

// Test utilities and common setup
mod common;

mod history_tests;
mod planner_tests;
mod scenario_tests;

// Re-export common utilities for use by test modules
pub use common::*;
