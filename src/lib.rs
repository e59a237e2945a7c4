// Library exports for nl-orchestrator
// This allows the modules to be imported in tests and external code

pub mod agent;
pub mod commands;
pub mod config;
pub mod error;
pub mod extraction;
pub mod history;
pub mod llm;
pub mod normalize;
pub mod persistence;
pub mod planning;
pub mod tools;

pub use agent::{Agent, Outcome, OutcomeStatus};
pub use config::Config;
pub use normalize::{normalize, ResultEnvelope};
