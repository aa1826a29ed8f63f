pub mod output;
pub mod plugin;
pub mod target;

pub use output::{ModuleOutput, PreparationVerdict};
pub use plugin::{Plugin, PluginCore, PluginDescriptor, PluginState};
pub use target::Target;
