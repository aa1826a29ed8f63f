pub mod config;
pub mod orchestrator;
pub mod params;
pub mod plugin_manager;
pub mod plugins;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use config::{Config, ConfigError};
pub use orchestrator::{
    result_channel, Invocation, ResultEnvelope, ResultReceiver, ResultSink, RunSummary, Runner,
    Task,
};
pub use params::{parse_args, ParseError};
pub use plugin_manager::{BuiltinPlugin, PluginError, PluginRegistry};
pub use types::{
    ModuleOutput, Plugin, PluginCore, PluginDescriptor, PluginState, PreparationVerdict, Target,
};
