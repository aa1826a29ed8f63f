use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::params::parse_args;
use crate::plugin_manager::{PluginError, Result};
use crate::types::{ModuleOutput, Plugin, PluginCore, Target};

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

pub const ECHO_MODULE: &str = "Test";
pub const ECHO_NAME: &str = "Echo";

const ECHO_OPTIONS: [&str; 4] = ["sentinel", "delay", "fail", "panic"];

/// Plugin that reports its `-sentinel` option back on the sink.
///
/// `-delay <ms>` sleeps before reporting, `-fail <msg>` aborts the
/// invocation instead and `-panic <msg>` panics inside `execute`.
#[derive(Debug)]
pub struct EchoPlugin {
    core: PluginCore,
    install_error: Option<String>,
    check_error: Option<String>,
}

impl EchoPlugin {
    pub fn new() -> Self {
        Self::named(ECHO_NAME)
    }

    pub fn named(name: &str) -> Self {
        Self {
            core: PluginCore::new(name, ECHO_MODULE),
            install_error: None,
            check_error: None,
        }
    }

    pub fn failing_install(mut self, error: &str) -> Self {
        self.install_error = Some(error.to_string());
        self
    }

    pub fn failing_check(mut self, error: &str) -> Self {
        self.check_error = Some(error.to_string());
        self
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PluginCore {
        &mut self.core
    }

    fn install(&self) -> Result<()> {
        match &self.install_error {
            Some(error) => Err(PluginError::Install(error.clone())),
            None => Ok(()),
        }
    }

    fn check(&self) -> Result<()> {
        match &self.check_error {
            Some(error) => Err(PluginError::Check(error.clone())),
            None => Ok(()),
        }
    }

    fn validate(&self) -> Result<()> {
        parse_args(self.parameter(), &ECHO_OPTIONS)?;
        Ok(())
    }

    async fn execute(&mut self, target: &Target) -> Result<Option<ModuleOutput>> {
        let options = parse_args(self.parameter(), &ECHO_OPTIONS)?;

        if let Ok(ms) = options["delay"].parse::<u64>() {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if !options["panic"].is_empty() {
            panic!("{}", options["panic"]);
        }
        if !options["fail"].is_empty() {
            return Err(PluginError::Execution(options["fail"].clone()));
        }

        let output = ModuleOutput::Raw(json!({ "sentinel": options["sentinel"] }));
        self.core.emit(target, output.clone())?;
        Ok(Some(output))
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self {
            core: self.core.fresh_clone(),
            install_error: self.install_error.clone(),
            check_error: self.check_error.clone(),
        })
    }
}
