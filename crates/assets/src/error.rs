//! Error types of the asset loading and processing.

use std::{path::PathBuf, sync::Arc};

use url::Url;

/// Error in loaders, roots or pipeline configuration.
///
/// Configuration errors are never recovered by fallback loaders.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Each root must have a unique, case-sensitive name. '{name}' is used twice")]
    DuplicateRoot { name: String },

    #[error("At least 1 asset root must be provided")]
    NoRoots,

    #[error("Loader class '{name}' is not registered")]
    UnknownLoaderClass { name: String },

    #[error("Loader class '{name}' is already registered")]
    DuplicateLoaderClass { name: String },

    #[error("At least 1 loader must be provided")]
    EmptyChain,

    #[error("Invalid configuration for loader class '{class}'. {reason}")]
    InvalidLoaderConfig { class: String, reason: String },

    #[error("Failed to resolve '{path}' against '{base}'. {error}")]
    InvalidRootUrl {
        base: Url,
        path: String,
        #[source]
        error: url::ParseError,
    },

    #[error("Failed to parse assets configuration. {reason}")]
    InvalidConfig { reason: String },

    #[error("Path '{path}' must have a root name and separating slash")]
    MissingRoot { path: String },

    #[error("Root '{name}' does not exist")]
    UnknownRoot { name: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        ConfigError::InvalidConfig {
            reason: error.to_string(),
        }
    }
}

/// Error type for asset loading.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Asset '{url}' not found")]
    NotFound { url: Url },

    #[error("Failed to read '{path}' from '{url}'")]
    Io {
        url: Url,
        path: PathBuf,
        #[source]
        error: Arc<std::io::Error>,
    },

    #[error("Failed to convert file url '{url}' to path")]
    InvalidPath { url: Url },

    #[error("Failed to fetch '{url}'")]
    Http {
        url: Url,
        #[source]
        error: Arc<reqwest::Error>,
    },

    #[error("Request to '{url}' failed with status {status}")]
    Status { url: Url, status: u16 },

    #[error("Failed to extract data from data url '{url}'")]
    InvalidDataUrl { url: Url },

    #[error("Unsupported scheme '{}' in '{url}'", url.scheme())]
    UnsupportedScheme { url: Url },

    #[error("Failed to resolve asset path '{path}' against '{root}'")]
    InvalidAssetPath {
        root: Url,
        path: String,
        #[source]
        error: url::ParseError,
    },

    #[error("Asset '{path}' is not available. {reason}")]
    Unavailable { path: String, reason: String },

    #[error(transparent)]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl LoadError {
    /// Returns `true` if this error may be recovered by trying another loader.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, LoadError::Config(_))
    }

    /// Wraps arbitrary error produced by custom loader.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LoadError::Custom(Arc::new(error))
    }
}

/// Error type for asset pipeline processing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("An asset must be a non-array object")]
    NotAnObject,

    #[error("A dependencies property must be a valid, non-array object")]
    MalformedDependencies,

    #[error("Dependency '{key}' must be a single asset, null or absent")]
    MalformedDependency { key: String },

    #[error("Asset field '{field}' has unexpected type")]
    InvalidField { field: &'static str },

    #[error("Failed to resolve dependency '{key}'")]
    Dependency {
        key: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Processor(Arc<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    /// Wraps arbitrary error produced by custom processor.
    pub fn processor<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PipelineError::Processor(Arc::new(error))
    }

    /// Returns innermost error, unwrapping dependency chain.
    pub fn root_cause(&self) -> &PipelineError {
        let mut error = self;
        while let PipelineError::Dependency { source, .. } = error {
            error = &**source;
        }
        error
    }

    /// Returns `true` if this error is caused by malformed configuration
    /// or asset document rather than by transport failure.
    pub fn is_config(&self) -> bool {
        match self.root_cause() {
            PipelineError::NotAnObject
            | PipelineError::MalformedDependencies
            | PipelineError::MalformedDependency { .. }
            | PipelineError::InvalidField { .. } => true,
            PipelineError::Load(LoadError::Config(_)) => true,
            _ => false,
        }
    }
}
