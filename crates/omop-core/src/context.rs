//! Run-wide inputs shared by every populator.

use omop_vocab::ConceptRegistry;

/// Placeholder logged instead of source data unless data logging is on.
pub const REDACTED_VALUE: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, Default)]
pub struct PopulateOptions {
    /// Allow row-level source values (patient data) in log output.
    pub log_data: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PopulateContext<'a> {
    pub registry: &'a ConceptRegistry,
    pub options: PopulateOptions,
}

impl<'a> PopulateContext<'a> {
    pub fn new(registry: &'a ConceptRegistry) -> Self {
        Self {
            registry,
            options: PopulateOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: PopulateOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_log_data(mut self, log_data: bool) -> Self {
        self.options.log_data = log_data;
        self
    }

    /// The value itself when data logging is enabled, otherwise a
    /// placeholder.
    pub fn redact<'v>(&self, value: &'v str) -> &'v str {
        if self.options.log_data {
            value
        } else {
            REDACTED_VALUE
        }
    }
}
