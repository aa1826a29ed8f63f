mod catalog;
mod error;
mod registry;

pub use catalog::BuiltinPlugin;
pub use error::PluginError;
pub use registry::PluginRegistry;

pub type Result<T> = std::result::Result<T, PluginError>;
