#![forbid(unsafe_code)]

//! Per-source configuration.

use std::borrow::Cow;

/// Options shared by every data source implementation.
///
/// # Example
///
/// ```
/// use sectioned_core::SourceConfig;
///
/// let config = SourceConfig::new("inbox").with_trace_events(true);
/// assert_eq!(config.label(), "inbox");
/// assert!(config.trace_events());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    label: Cow<'static, str>,
    trace_events: bool,
}

impl SourceConfig {
    /// Create a config whose log fields identify the source as `label`.
    #[must_use]
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            trace_events: false,
        }
    }

    /// Log every delivered event at `TRACE` level.
    #[must_use]
    pub fn with_trace_events(mut self, enabled: bool) -> Self {
        self.trace_events = enabled;
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn trace_events(&self) -> bool {
        self.trace_events
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new("source")
    }
}
