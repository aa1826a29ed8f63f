use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::orchestrator::sink::ResultSink;
use crate::plugin_manager::{PluginError, Result};

use super::{ModuleOutput, Target};

mod descriptor;
pub use descriptor::PluginDescriptor;

/// Core plugin interface that every scan stage plugin implements.
///
/// Instances held by the registry are templates: they are only ever reached
/// through shared references and are never executed. Work is done on the
/// fresh instance returned by [`Plugin::clone_plugin`], which starts without
/// a parameter or a result sink.
#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Identity and per-invocation configuration shared by all plugins
    fn core(&self) -> &PluginCore;

    fn core_mut(&mut self) -> &mut PluginCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn set_name(&mut self, name: String) {
        self.core_mut().name = name;
    }

    /// The pipeline stage this plugin belongs to
    fn module(&self) -> &str {
        self.core().module()
    }

    fn set_module(&mut self, module: String) {
        self.core_mut().module = module;
    }

    /// Raw parameter string, empty until one is set
    fn parameter(&self) -> &str {
        self.core().parameter()
    }

    /// Store the raw parameter verbatim. Parsing happens in `validate` and
    /// `execute`.
    fn set_parameter(&mut self, parameter: String) {
        self.core_mut().parameter = parameter;
    }

    fn set_result(&mut self, sink: ResultSink) {
        self.core_mut().sink = Some(sink);
    }

    /// One-time preparation of external resources. Must be idempotent.
    fn install(&self) -> Result<()> {
        Ok(())
    }

    /// Readiness probe. Must be fast and free of side effects.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Validate the stored parameter before the plugin is scheduled
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Run the unit of work against `target`, reporting through the
    /// configured sink.
    async fn execute(&mut self, target: &Target) -> Result<Option<ModuleOutput>>;

    /// Fresh instance carrying only the name and module
    fn clone_plugin(&self) -> Box<dyn Plugin>;
}

/// State embedded in every concrete plugin
#[derive(Debug, Default)]
pub struct PluginCore {
    name: String,
    module: String,
    parameter: String,
    sink: Option<ResultSink>,
}

impl PluginCore {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            parameter: String::new(),
            sink: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn sink(&self) -> Option<&ResultSink> {
        self.sink.as_ref()
    }

    /// Copy of the identity with parameter and sink reset
    pub fn fresh_clone(&self) -> Self {
        Self::new(self.name.clone(), self.module.clone())
    }

    /// Report a completed result for `target` on the configured sink
    pub fn emit(&self, target: &Target, output: ModuleOutput) -> Result<()> {
        let sink = self.sink.as_ref().ok_or_else(|| {
            PluginError::Execution(format!("{}/{} has no result sink", self.module, self.name))
        })?;
        sink.completed(&self.name, &self.module, &target.host, output)
    }
}

/// Lifecycle of a single plugin clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginState {
    Created,
    Installed,
    Checked,
    Configured,
    Executing,
    Completed,
    Failed,
}

impl PluginState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Installed => write!(f, "Installed"),
            Self::Checked => write!(f, "Checked"),
            Self::Configured => write!(f, "Configured"),
            Self::Executing => write!(f, "Executing"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}
