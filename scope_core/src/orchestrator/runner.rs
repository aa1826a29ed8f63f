use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::orchestrator::invocation::Invocation;
use crate::orchestrator::sink::{result_channel, ResultReceiver, ResultSink};
use crate::plugin_manager::{PluginError, PluginRegistry, Result};
use crate::types::{PluginDescriptor, Target};

/// One plugin to run against one target
#[derive(Debug, Clone)]
pub struct Task {
    pub module: String,
    pub plugin: String,
    /// Overrides the configured parameter when set
    pub parameter: Option<String>,
    pub target: Target,
    pub correlation_id: Option<Uuid>,
}

impl Task {
    pub fn new(module: impl Into<String>, plugin: impl Into<String>, target: Target) -> Self {
        Self {
            module: module.into(),
            plugin: plugin.into(),
            parameter: None,
            target,
            correlation_id: None,
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new(&self.module, &self.plugin)
    }
}

/// Counts reported by [`Runner::run_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dispatched: usize,
    pub rejected: usize,
    pub failed_to_join: usize,
}

/// Drives plugin clones from the registry to the result sink.
///
/// Every dispatched task gets its own clone. Lookup, readiness and parameter
/// validation happen before a clone is scheduled; execution runs on a tokio
/// task bounded by `max_concurrency`. The receiver returned by
/// [`Runner::new`] completes once the runner and every running clone are
/// dropped.
#[derive(Debug)]
pub struct Runner {
    registry: PluginRegistry,
    sink: ResultSink,
    permits: Arc<Semaphore>,
    config: Config,
    unavailable: HashSet<PluginDescriptor>,
}

impl Runner {
    pub fn new(registry: PluginRegistry, config: &Config) -> (Self, ResultReceiver) {
        let (sink, receiver) = result_channel();
        let max_concurrency = config
            .runner
            .max_concurrency
            .clamp(1, Semaphore::MAX_PERMITS);
        debug!(
            max_concurrency,
            timeout = ?config.runner.task_timeout(),
            "Creating runner"
        );

        let runner = Self {
            registry,
            sink,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            config: config.clone(),
            unavailable: HashSet::new(),
        };
        (runner, receiver)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Run `install` once for every registered plugin. Plugins that fail are
    /// refused by [`Runner::dispatch`] for the rest of the run.
    pub fn install_all(&mut self) -> Vec<(PluginDescriptor, PluginError)> {
        let mut failures = Vec::new();

        for descriptor in self.registry.descriptors() {
            let result = self
                .registry
                .get_clone(&descriptor.module, &descriptor.name)
                .and_then(|plugin| Invocation::new(plugin).install());

            match result {
                Ok(()) => debug!(
                    plugin = %descriptor.name,
                    module = %descriptor.module,
                    "Installed"
                ),
                Err(e) => {
                    error!(
                        plugin = %descriptor.name,
                        module = %descriptor.module,
                        "Install failed, plugin disabled for this run: {}", e
                    );
                    self.unavailable.insert(descriptor.clone());
                    failures.push((descriptor, e));
                }
            }
        }

        failures
    }

    /// Prepare a clone for `task` and schedule its execution.
    ///
    /// Errors returned here mean nothing was scheduled. Errors raised while
    /// executing, panics included, are written to the sink as failed results.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn dispatch(&self, task: Task) -> Result<JoinHandle<()>> {
        let plugin = self.registry.get_clone(&task.module, &task.plugin)?;
        let descriptor = task.descriptor();
        if self.unavailable.contains(&descriptor) {
            return Err(PluginError::Unavailable {
                module: descriptor.module,
                name: descriptor.name,
            });
        }

        let mut invocation = Invocation::new(plugin);
        invocation.check()?;

        let parameter = self.parameter_for(&task);
        let sink = self.sink.correlated(task.correlation_id);
        invocation.configure(parameter, sink.clone())?;

        let permits = Arc::clone(&self.permits);
        let deadline = self.config.runner.task_timeout();
        debug!(
            plugin = %descriptor.name,
            module = %descriptor.module,
            host = %task.target,
            correlation_id = ?task.correlation_id,
            "Dispatching"
        );

        Ok(tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let result = AssertUnwindSafe(invocation.execute(&task.target, deadline))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(PluginError::Execution(format!(
                        "plugin panicked: {}",
                        panic_message(&*payload)
                    )))
                });

            if let Err(e) = result {
                if let Err(send_error) =
                    sink.failed(&descriptor.name, &descriptor.module, &task.target.host, &e)
                {
                    warn!(
                        plugin = %descriptor.name,
                        module = %descriptor.module,
                        "Dropping failure report: {}", send_error
                    );
                }
            }
        }))
    }

    /// Dispatch every task and wait for all scheduled executions to finish
    pub async fn run_all(&self, tasks: impl IntoIterator<Item = Task>) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut handles = Vec::new();

        for task in tasks {
            let descriptor = task.descriptor();
            let host = task.target.host.clone();
            match self.dispatch(task) {
                Ok(handle) => {
                    summary.dispatched += 1;
                    handles.push(handle);
                }
                Err(e) => {
                    warn!(
                        plugin = %descriptor.name,
                        module = %descriptor.module,
                        host = %host,
                        "Task rejected: {}", e
                    );
                    summary.rejected += 1;
                }
            }
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!("Plugin task did not finish: {}", e);
                summary.failed_to_join += 1;
            }
        }

        info!(
            dispatched = summary.dispatched,
            rejected = summary.rejected,
            failed_to_join = summary.failed_to_join,
            "Run finished"
        );
        summary
    }

    fn parameter_for(&self, task: &Task) -> String {
        task.parameter
            .clone()
            .or_else(|| {
                self.config
                    .parameter_for(&task.module, &task.plugin)
                    .map(String::from)
            })
            .unwrap_or_default()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
