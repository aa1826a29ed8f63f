use crate::params::ParseError;
use crate::types::plugin::PluginState;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin not found: {module}/{name}")]
    NotFound { module: String, name: String },

    #[error("Plugin already registered: {module}/{name}")]
    AlreadyRegistered { module: String, name: String },

    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    #[error("Plugin unavailable for this run: {module}/{name}")]
    Unavailable { module: String, name: String },

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Check failed: {0}")]
    Check(String),

    #[error("Invalid parameter: {0}")]
    Parse(#[from] ParseError),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Cannot {operation} a plugin in state {state}")]
    InvalidState {
        state: PluginState,
        operation: &'static str,
    },

    #[error("Result sink is closed")]
    SinkClosed,

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),
}
