//! Typed site settings and their hand-off to the core builders.

use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use arbor_core::{DEFAULT_MAX_REDIRECTS, LogConfig, LogFormat, LogLevel, Scope, SiteBuilder};
use serde::Deserialize;

/// Upper bound accepted for `max_redirects`.
pub const MAX_REDIRECTS_LIMIT: usize = 100;

/// Built-in scope a site dispatches under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeName {
    #[default]
    Http,
    Generic,
}

impl ScopeName {
    pub fn scope(self) -> Scope {
        match self {
            ScopeName::Http => Scope::HTTP,
            ScopeName::Generic => Scope::GENERIC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directive string such as `arbor_core=trace`.
    pub filter: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            filter: None,
        }
    }
}

/// Settings for one [`arbor_core::Site`]. Every field has a default, so
/// an empty source yields a working site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub max_redirects: usize,
    pub scope: ScopeName,
    pub log: LogSettings,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            scope: ScopeName::default(),
            log: LogSettings::default(),
        }
    }
}

impl SiteSettings {
    /// Carry the dispatch settings over to `builder`.
    pub fn apply(&self, builder: SiteBuilder) -> SiteBuilder {
        builder
            .max_redirects(self.max_redirects)
            .scope(self.scope.scope())
    }

    pub fn log_config(&self) -> LogConfig {
        let config = LogConfig::new().level(self.log.level).format(self.log.format);
        match &self.log.filter {
            Some(filter) => config.with_env_filter(filter.clone()),
            None => config,
        }
    }
}

impl Validate for SiteSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(self.max_redirects, 1, MAX_REDIRECTS_LIMIT, "max_redirects")?;
        if let Some(filter) = &self.log.filter {
            ConfigValidator::not_empty(filter, "log.filter")?;
        }
        Ok(())
    }
}
