use serde::{Deserialize, Serialize};
use std::fmt;

use super::Plugin;

/// Identity of a registered plugin, as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Pipeline stage of the plugin
    pub module: String,
    /// Name of the plugin within its module
    pub name: String,
}

impl PluginDescriptor {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    pub fn of(plugin: &dyn Plugin) -> Self {
        Self::new(plugin.module(), plugin.name())
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.module, self.name)
    }
}
