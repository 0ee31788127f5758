//! Error types for report generation

use thiserror::Error;

/// Boxed error returned by a cluster collaborator
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while collecting, computing or writing a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// A quantity string in a workload or limit range could not be parsed
    #[error("invalid quantity {value:?} for {resource}: {reason}")]
    InvalidQuantity {
        resource: String,
        value: String,
        reason: String,
    },

    /// The collaborator reported that the requested object does not exist
    #[error("{what} not found in namespace {namespace}")]
    NotFound { what: String, namespace: String },

    /// The collaborator failed for a reason other than absence
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: BoxError,
    },

    /// A row could not be placed into its sheet
    #[error("cannot write to sheet {sheet}: {reason}")]
    Render { sheet: String, reason: String },

    #[error("workbook I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The report file could not be read or written as a spreadsheet
    #[error("spreadsheet error for {path}: {reason}")]
    Spreadsheet { path: String, reason: String },
}

impl ReportError {
    /// Build a fetch error from any collaborator error
    pub fn fetch(what: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ReportError::Fetch {
            what: what.into(),
            source: source.into(),
        }
    }

    /// Returns true for the absence signal, which callers treat as "no value"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReportError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
