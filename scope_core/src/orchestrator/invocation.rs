use std::time::Duration;
use tracing::{debug, warn};

use crate::orchestrator::sink::ResultSink;
use crate::plugin_manager::{PluginError, Result};
use crate::types::{ModuleOutput, Plugin, PluginDescriptor, PluginState, Target};

use PluginState::*;

/// One plugin clone driven through its lifecycle.
///
/// `Created -> Installed? -> Checked? -> Configured -> Executing ->
/// Completed | Failed`. Terminal states are final; running the plugin again
/// takes a new clone.
#[derive(Debug)]
pub struct Invocation {
    plugin: Box<dyn Plugin>,
    state: PluginState,
}

impl Invocation {
    pub fn new(plugin: Box<dyn Plugin>) -> Self {
        Self {
            plugin,
            state: Created,
        }
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::of(self.plugin.as_ref())
    }

    pub fn install(&mut self) -> Result<()> {
        self.require_state(&[Created], "install")?;
        let result = self.plugin.install();
        self.settle(&result, Installed);
        result
    }

    /// Readiness probe. May be repeated until the clone is configured.
    pub fn check(&mut self) -> Result<()> {
        self.require_state(&[Created, Installed, Checked], "check")?;
        let result = self.plugin.check();
        self.settle(&result, Checked);
        result
    }

    /// Hand the clone its parameter and sink, then validate the parameter.
    pub fn configure(&mut self, parameter: impl Into<String>, sink: ResultSink) -> Result<()> {
        self.require_state(&[Created, Installed, Checked], "configure")?;
        self.plugin.set_parameter(parameter.into());
        self.plugin.set_result(sink);
        let result = self.plugin.validate();
        self.settle(&result, Configured);
        result
    }

    /// Run the configured clone, failing with [`PluginError::Timeout`] once
    /// `deadline` elapses.
    pub async fn execute(
        &mut self,
        target: &Target,
        deadline: Option<Duration>,
    ) -> Result<Option<ModuleOutput>> {
        self.require_state(&[Configured], "execute")?;
        self.transition(Executing);

        let work = self.plugin.execute(target);
        let result = match deadline {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or(Err(PluginError::Timeout(limit))),
            None => work.await,
        };

        self.settle(&result, Completed);
        result
    }

    fn require_state(&self, allowed: &[PluginState], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PluginError::InvalidState {
                state: self.state,
                operation,
            })
        }
    }

    fn settle<T>(&mut self, result: &Result<T>, next: PluginState) {
        match result {
            Ok(_) => self.transition(next),
            Err(e) => {
                warn!(
                    plugin = %self.plugin.name(),
                    module = %self.plugin.module(),
                    state = %self.state,
                    "Plugin failed: {}", e
                );
                self.transition(Failed);
            }
        }
    }

    fn transition(&mut self, next: PluginState) {
        debug!(
            plugin = %self.plugin.name(),
            module = %self.plugin.module(),
            "{} -> {}", self.state, next
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::sink::result_channel;
    use crate::test_utils::{init_test_logging, EchoPlugin};
    use serde_json::json;

    #[tokio::test]
    async fn test_full_lifecycle() {
        init_test_logging();
        let (sink, mut receiver) = result_channel();
        let mut invocation = Invocation::new(EchoPlugin::new().clone_plugin());
        assert_eq!(invocation.state(), Created);

        invocation.install().unwrap();
        assert_eq!(invocation.state(), Installed);
        invocation.check().unwrap();
        assert_eq!(invocation.state(), Checked);
        invocation.configure("-sentinel s1", sink).unwrap();
        assert_eq!(invocation.state(), Configured);
        assert_eq!(invocation.plugin().parameter(), "-sentinel s1");

        let output = invocation
            .execute(&Target::new("example.com"), None)
            .await
            .unwrap();
        assert_eq!(output, Some(ModuleOutput::Raw(json!({ "sentinel": "s1" }))));
        assert_eq!(invocation.state(), Completed);

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.target, "example.com");
        assert_eq!(envelope.output(), output.as_ref());
    }

    #[tokio::test]
    async fn test_install_and_check_are_optional() {
        let (sink, _receiver) = result_channel();
        let mut invocation = Invocation::new(EchoPlugin::new().clone_plugin());

        invocation.configure("", sink).unwrap();
        invocation.execute(&Target::new("t"), None).await.unwrap();
        assert_eq!(invocation.state(), Completed);
    }

    #[tokio::test]
    async fn test_execute_requires_configuration() {
        let mut invocation = Invocation::new(EchoPlugin::new().clone_plugin());

        let result = invocation.execute(&Target::new("t"), None).await;
        assert!(matches!(
            result,
            Err(PluginError::InvalidState {
                state: Created,
                operation: "execute"
            })
        ));
        assert_eq!(invocation.state(), Created);
    }

    #[tokio::test]
    async fn test_no_transition_out_of_terminal_state() {
        let (sink, _receiver) = result_channel();
        let mut invocation = Invocation::new(EchoPlugin::new().clone_plugin());
        invocation.configure("-sentinel once", sink.clone()).unwrap();
        invocation.execute(&Target::new("t"), None).await.unwrap();

        assert!(invocation.execute(&Target::new("t"), None).await.is_err());
        assert!(invocation.configure("-sentinel twice", sink).is_err());
        assert!(invocation.check().is_err());
        assert_eq!(invocation.plugin().parameter(), "-sentinel once");
    }

    #[test]
    fn test_configure_rejects_bad_parameter() {
        let (sink, _receiver) = result_channel();
        let mut invocation = Invocation::new(EchoPlugin::new().clone_plugin());

        let result = invocation.configure("-nope x", sink);
        assert!(matches!(result, Err(PluginError::Parse(_))));
        assert_eq!(invocation.state(), Failed);
    }

    #[test]
    fn test_check_failure_is_terminal() {
        let mut invocation =
            Invocation::new(EchoPlugin::new().failing_check("missing tool").clone_plugin());

        assert!(matches!(invocation.check(), Err(PluginError::Check(_))));
        assert_eq!(invocation.state(), Failed);
    }

    #[tokio::test]
    async fn test_execution_error_and_timeout() {
        let (sink, _receiver) = result_channel();

        let mut failing = Invocation::new(EchoPlugin::new().clone_plugin());
        failing.configure("-fail broken", sink.clone()).unwrap();
        let result = failing.execute(&Target::new("t"), None).await;
        assert!(matches!(result, Err(PluginError::Execution(msg)) if msg == "broken"));
        assert_eq!(failing.state(), Failed);

        let mut slow = Invocation::new(EchoPlugin::new().clone_plugin());
        slow.configure("-delay 500", sink).unwrap();
        let limit = Duration::from_millis(20);
        let result = slow.execute(&Target::new("t"), Some(limit)).await;
        assert!(matches!(result, Err(PluginError::Timeout(d)) if d == limit));
        assert_eq!(slow.state(), Failed);
    }
}
