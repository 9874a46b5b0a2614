use thiserror::Error;

/// Application-wide error types for trialwatch.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A registry page could not be displayed (navigation or pagination failed).
    #[error("Render error on page {page}: {message}")]
    RenderError { page: u32, message: String },

    /// The rendered page did not have the expected table/row structure.
    #[error("Extraction error on page {page}: {message}")]
    ExtractionError { page: u32, message: String },

    /// No records were extracted from any page.
    #[error("No records extracted from {pages_scanned} page(s); the registry layout may have changed")]
    NoRecords { pages_scanned: u32 },

    /// Reading or writing the persisted snapshot failed.
    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    /// The notification could not be delivered.
    #[error("Delivery error: {0}")]
    DeliveryError(String),

    /// Operation timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error, raised while scanning a single page,
    /// only costs that page and the scan can move on to the next one.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            AppError::RenderError { .. } | AppError::ExtractionError { .. } | AppError::Timeout(_)
        )
    }
}
