//! Error types for kgqa operations.
//!
//! The taxonomy mirrors the stages of the pipeline: extraction (graph
//! construction), resolution (anchor lookup), store access and configuration.
//! Generative-backend failures are carried as [`KgError::Backend`].

use std::error::Error;
use std::fmt;

/// Result type for kgqa operations.
pub type Result<T> = std::result::Result<T, KgError>;

/// Result type for graph store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during kgqa operations.
#[derive(Debug, Clone)]
pub enum KgError {
    /// A generated mutation statement could not be applied.
    Extraction(ExtractionError),
    /// No usable anchor node for a question.
    Resolution(ResolutionError),
    /// The graph store failed.
    Store(StoreError),
    /// The generative backend failed.
    Backend(String),
    /// Configuration errors.
    Config(ConfigError),
    /// I/O errors (wrapped).
    Io(String),
    /// Serialization errors.
    Serialization(String),
}

impl fmt::Display for KgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KgError::Extraction(e) => write!(f, "Extraction error: {}", e),
            KgError::Resolution(e) => write!(f, "Resolution error: {}", e),
            KgError::Store(e) => write!(f, "Store error: {}", e),
            KgError::Backend(msg) => write!(f, "Backend error: {}", msg),
            KgError::Config(e) => write!(f, "Config error: {}", e),
            KgError::Io(msg) => write!(f, "I/O error: {}", msg),
            KgError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for KgError {}

impl From<std::io::Error> for KgError {
    fn from(e: std::io::Error) -> Self {
        KgError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for KgError {
    fn from(e: serde_json::Error) -> Self {
        KgError::Serialization(e.to_string())
    }
}

impl From<StoreError> for KgError {
    fn from(e: StoreError) -> Self {
        KgError::Store(e)
    }
}

impl From<ExtractionError> for KgError {
    fn from(e: ExtractionError) -> Self {
        KgError::Extraction(e)
    }
}

impl From<ResolutionError> for KgError {
    fn from(e: ResolutionError) -> Self {
        KgError::Resolution(e)
    }
}

/// Errors raised while turning generated statements into graph mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Statement was empty after cleanup.
    EmptyStatement,
    /// Quoting is still broken after sanitization.
    UnbalancedQuotes(String),
    /// The store refused the statement.
    Rejected { index: usize, reason: String },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::EmptyStatement => write!(f, "Statement is empty"),
            ExtractionError::UnbalancedQuotes(stmt) => {
                write!(f, "Unbalanced quoting in statement: {}", stmt)
            }
            ExtractionError::Rejected { index, reason } => {
                write!(f, "Statement #{} rejected: {}", index, reason)
            }
        }
    }
}

impl Error for ExtractionError {}

/// Errors raised while picking an anchor node.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// The store holds no nodes to anchor on.
    EmptyInventory,
    /// The backend named a node that is not in the inventory.
    UnknownNode(String),
    /// The backend call itself failed or returned malformed output.
    Backend(String),
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::EmptyInventory => write!(f, "Graph has no nodes"),
            ResolutionError::UnknownNode(id) => {
                write!(f, "Anchor node not in inventory: {}", id)
            }
            ResolutionError::Backend(msg) => write!(f, "Anchor detection failed: {}", msg),
        }
    }
}

impl Error for ResolutionError {}

/// Graph store errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Could not reach the backing store.
    Connection(String),
    /// Statement is not valid in the store's query language.
    Syntax(String),
    /// Statement was valid but could not be applied.
    Execution(String),
    /// Anchor or endpoint does not exist.
    NodeNotFound(String),
    /// Radius must be at least 1.
    InvalidRadius(usize),
    /// The session was already disconnected.
    Disconnected,
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "Connection failed: {}", msg),
            StoreError::Syntax(msg) => write!(f, "Syntax error: {}", msg),
            StoreError::Execution(msg) => write!(f, "Execution failed: {}", msg),
            StoreError::NodeNotFound(id) => write!(f, "Node not found: {}", id),
            StoreError::InvalidRadius(r) => write!(f, "Invalid radius: {} (must be >= 1)", r),
            StoreError::Disconnected => write!(f, "Store session is disconnected"),
            StoreError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl Error for StoreError {}

/// Configuration errors.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Invalid value.
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// Missing required field.
    MissingField(String),
    /// Backend was requested but not compiled in.
    FeatureDisabled(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value for {}: {} ({})", field, value, reason)
            }
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ConfigError::FeatureDisabled(feature) => {
                write!(f, "Feature not enabled in this build: {}", feature)
            }
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for KgError {
    fn from(e: ConfigError) -> Self {
        KgError::Config(e)
    }
}

// Convenience constructors
impl KgError {
    pub fn backend(msg: impl Into<String>) -> Self {
        KgError::Backend(msg.into())
    }

    pub fn unknown_anchor(id: impl Into<String>) -> Self {
        KgError::Resolution(ResolutionError::UnknownNode(id.into()))
    }

    pub fn missing_config(field: impl Into<String>) -> Self {
        KgError::Config(ConfigError::MissingField(field.into()))
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        KgError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }

    /// Whether this error came from the graph store.
    pub fn is_store(&self) -> bool {
        matches!(self, KgError::Store(_))
    }
}

impl StoreError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        StoreError::Syntax(msg.into())
    }

    pub fn backend(e: impl fmt::Display) -> Self {
        StoreError::Backend(e.to_string())
    }
}
