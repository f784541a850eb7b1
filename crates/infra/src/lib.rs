//! Infrastructure layer: event storage, command dispatch, read models,
//! dropdown storage and configuration.

pub mod command_dispatcher;
pub mod config;
pub mod dropdowns;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{AppConfig, ConfigError};
