use super::{registry::PluginRegistry, Result};
use crate::plugins::port_scan_preparation::{self, SkipCdn};
use crate::types::Plugin;

/// Every plugin shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinPlugin {
    SkipCdn,
}

impl BuiltinPlugin {
    pub const ALL: [BuiltinPlugin; 1] = [BuiltinPlugin::SkipCdn];

    pub fn module(self) -> &'static str {
        match self {
            Self::SkipCdn => port_scan_preparation::MODULE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SkipCdn => port_scan_preparation::SKIP_CDN,
        }
    }

    pub fn from_key(module: &str, name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|plugin| plugin.module() == module && plugin.name() == name)
    }

    /// Build the canonical instance to register
    pub fn instantiate(self) -> Box<dyn Plugin> {
        match self {
            Self::SkipCdn => Box::new(SkipCdn::new()),
        }
    }
}

impl PluginRegistry {
    /// Registry populated with every built-in plugin
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        for plugin in BuiltinPlugin::ALL {
            registry.register(plugin.instantiate())?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys_match_instances() {
        for builtin in BuiltinPlugin::ALL {
            let plugin = builtin.instantiate();
            assert_eq!(plugin.name(), builtin.name());
            assert_eq!(plugin.module(), builtin.module());
            assert_eq!(
                BuiltinPlugin::from_key(builtin.module(), builtin.name()),
                Some(builtin)
            );
        }
        assert_eq!(BuiltinPlugin::from_key("PortScanPreparation", "Nope"), None);
    }

    #[test]
    fn test_with_builtins() {
        let registry = PluginRegistry::with_builtins().unwrap();
        assert_eq!(registry.len(), BuiltinPlugin::ALL.len());
        assert!(registry.contains("PortScanPreparation", "SkipCdn"));
    }
}
