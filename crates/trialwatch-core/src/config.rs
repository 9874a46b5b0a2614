use crate::diff::FirstRunPolicy;
use crate::error::AppError;
use crate::report::DEFAULT_FLAG_MARKER;

/// Number of listing pages scanned per run unless configured otherwise.
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// Upper bound for `max_pages`; the listing shows ten rows per page and
/// new approvals never reach that deep between two runs.
pub const MAX_PAGES_LIMIT: u32 = 100;

/// Settings of the monitor pipeline itself.
///
/// Built once at startup and handed to [`crate::monitor::MonitorService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Pages 1..=max_pages are scanned on every run.
    pub max_pages: u32,
    /// Title substring that puts a record in the flagged table.
    pub flag_marker: String,
    pub first_run: FirstRunPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            flag_marker: DEFAULT_FLAG_MARKER.to_string(),
            first_run: FirstRunPolicy::Suppress,
        }
    }
}

impl MonitorConfig {
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_flag_marker(mut self, marker: impl Into<String>) -> Self {
        self.flag_marker = marker.into();
        self
    }

    pub fn with_first_run(mut self, policy: FirstRunPolicy) -> Self {
        self.first_run = policy;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_pages == 0 {
            return Err(AppError::ConfigError(
                "max pages must be at least 1".into(),
            ));
        }
        if self.max_pages > MAX_PAGES_LIMIT {
            return Err(AppError::ConfigError(format!(
                "max pages must be at most {MAX_PAGES_LIMIT}, got {}",
                self.max_pages
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_registry_monitor() {
        let config = MonitorConfig::default();
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.flag_marker, "[디지털의료기기]");
        assert_eq!(config.first_run, FirstRunPolicy::Suppress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_pages_is_rejected() {
        let err = MonitorConfig::default().with_max_pages(0).validate().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn page_count_is_bounded() {
        assert!(
            MonitorConfig::default()
                .with_max_pages(MAX_PAGES_LIMIT)
                .validate()
                .is_ok()
        );
        for pages in [MAX_PAGES_LIMIT + 1, u32::MAX] {
            let err = MonitorConfig::default()
                .with_max_pages(pages)
                .validate()
                .unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)));
        }
    }
}
