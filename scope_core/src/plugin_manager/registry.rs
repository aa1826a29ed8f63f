use super::{error::PluginError, Result};
use crate::types::{Plugin, PluginDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Registry of canonical plugin instances, grouped by module.
///
/// Canonical instances are stored behind `Arc` and only ever lent out as
/// shared references, so they cannot be configured or executed. Callers get
/// a working copy from [`PluginRegistry::get_clone`].
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    modules: Arc<RwLock<HashMap<String, Vec<Arc<dyn Plugin>>>>>,
}

impl PluginRegistry {
    /// Create an empty plugin registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical plugin instance under its own module
    pub fn register(&self, plugin: Box<dyn Plugin>) -> Result<PluginDescriptor> {
        let descriptor = PluginDescriptor::of(plugin.as_ref());
        if descriptor.name.is_empty() || descriptor.module.is_empty() {
            return Err(PluginError::InvalidPlugin(format!(
                "plugin name and module must be set, got {:?}",
                descriptor
            )));
        }

        let mut modules = self
            .modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let plugins = modules.entry(descriptor.module.clone()).or_default();

        if plugins.iter().any(|p| p.name() == descriptor.name) {
            return Err(PluginError::AlreadyRegistered {
                module: descriptor.module,
                name: descriptor.name,
            });
        }

        plugins.push(Arc::from(plugin));
        info!(
            module = %descriptor.module,
            plugin = %descriptor.name,
            "Registered plugin"
        );
        Ok(descriptor)
    }

    /// Produce a fresh, independently owned copy of a registered plugin
    pub fn get_clone(&self, module: &str, name: &str) -> Result<Box<dyn Plugin>> {
        let canonical = self.canonical(module, name)?;
        debug!(module, plugin = name, "Cloning plugin");
        Ok(canonical.clone_plugin())
    }

    /// Plugins registered under `module`, in registration order
    pub fn plugins(&self, module: &str) -> Vec<PluginDescriptor> {
        self.read()
            .get(module)
            .map(|plugins| {
                plugins
                    .iter()
                    .map(|p| PluginDescriptor::of(p.as_ref()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of every module with at least one plugin, sorted
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.read().keys().cloned().collect();
        modules.sort();
        modules
    }

    /// Every registered plugin, grouped by sorted module name
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.modules()
            .iter()
            .flat_map(|module| self.plugins(module))
            .collect()
    }

    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.canonical(module, name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn canonical(&self, module: &str, name: &str) -> Result<Arc<dyn Plugin>> {
        self.read()
            .get(module)
            .and_then(|plugins| plugins.iter().find(|p| p.name() == name))
            .cloned()
            .ok_or_else(|| PluginError::NotFound {
                module: module.to_string(),
                name: name.to_string(),
            })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Arc<dyn Plugin>>>> {
        self.modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
