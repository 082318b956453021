#![forbid(unsafe_code)]

//! Delivery loop configuration.

use std::sync::Arc;

use pixhop_core::{Diagnostics, Displayer, SetContentDisplayer, SilentDiagnostics};

use crate::diagnostics::TracingDiagnostics;

/// Environment variable enabling drop diagnostics (`1/0/true/false/yes/no/on/off`).
pub const ENV_LOG_DROPS: &str = "PIXHOP_LOG_DROPS";
/// Environment variable overriding the presentation thread name.
pub const ENV_THREAD_NAME: &str = "PIXHOP_THREAD_NAME";

const DEFAULT_THREAD_NAME: &str = "pixhop-presenter";

/// Configuration for a delivery loop.
#[derive(Clone)]
pub struct DeliveryConfig {
    /// Displayer used for requests that do not carry their own.
    pub default_displayer: Arc<dyn Displayer>,
    /// Explicit diagnostics sink. Takes precedence over `log_drops`.
    pub diagnostics: Option<Arc<dyn Diagnostics>>,
    /// Name of the dedicated presentation thread, when one is spawned.
    pub thread_name: String,
    /// Report dropped deliveries through `tracing`.
    pub log_drops: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_displayer: Arc::new(SetContentDisplayer),
            diagnostics: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            log_drops: false,
        }
    }
}

impl DeliveryConfig {
    /// Defaults, overridden from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults, overridden through a custom environment lookup (for tests).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = get_env(ENV_LOG_DROPS).and_then(|v| parse_bool(&v)) {
            config.log_drops = value;
        }
        if let Some(name) = get_env(ENV_THREAD_NAME) {
            let name = name.trim();
            if !name.is_empty() {
                config.thread_name = name.to_string();
            }
        }
        config
    }

    #[must_use]
    pub fn with_default_displayer(mut self, displayer: Arc<dyn Displayer>) -> Self {
        self.default_displayer = displayer;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[must_use]
    pub fn with_log_drops(mut self, enabled: bool) -> Self {
        self.log_drops = enabled;
        self
    }

    /// The diagnostics sink this configuration resolves to.
    #[must_use]
    pub fn resolve_diagnostics(&self) -> Arc<dyn Diagnostics> {
        match &self.diagnostics {
            Some(diagnostics) => diagnostics.clone(),
            None if self.log_drops => Arc::new(TracingDiagnostics),
            None => Arc::new(SilentDiagnostics),
        }
    }
}

impl std::fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("has_diagnostics", &self.diagnostics.is_some())
            .field("thread_name", &self.thread_name)
            .field("log_drops", &self.log_drops)
            .finish_non_exhaustive()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
