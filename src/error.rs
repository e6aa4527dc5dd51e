//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: manifest read/parse/write failures (abort one repository)
//! - ChecksumError: auxiliary checksum fetch failures (logged, never fatal)
//! - ConfigError: project configuration and CLI value problems
//! - IoError: working copy access failures

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Checksum fetch related errors
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// A repository worker panicked or was cancelled
    #[error("worker task failed: {0}")]
    TaskPanic(String),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error (package.json)
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// XML parsing error (pom.xml)
    #[error("failed to parse XML in {path}: {message}")]
    XmlParseError { path: PathBuf, message: String },

    /// YAML parsing error (Chart.yaml, requirements.yaml)
    #[error("failed to parse YAML in {path}: {message}")]
    YamlParseError { path: PathBuf, message: String },

    /// The manifest parsed but the version field could not be located safely
    #[error("unsupported layout in {path}: {message}")]
    UnsupportedLayout { path: PathBuf, message: String },

    /// A path escaped the working copy
    #[error("path {path} is outside the working copy")]
    OutsideWorkingCopy { path: PathBuf },

    /// Failed to walk the working copy
    #[error("failed to scan {path}: {message}")]
    WalkError { path: PathBuf, message: String },
}

/// Errors related to checksum fetching
#[derive(Error, Debug)]
pub enum ChecksumError {
    /// Network request failed
    #[error("failed to fetch {url}: {message}")]
    NetworkError { url: String, message: String },

    /// Non-success HTTP status
    #[error("unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Timeout
    #[error("timeout while fetching {url}")]
    Timeout { url: String },

    /// The formula has no url field to build the download from
    #[error("no url field to fetch a checksum for")]
    MissingUrl,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read configuration {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file
    #[error("failed to parse configuration {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Invalid filter rule
    #[error("invalid filter rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    /// Invalid change specification
    #[error("invalid change '{value}': expected KIND:ARTIFACT[#PROPERTY]=VERSION ({message})")]
    InvalidChange { value: String, message: String },

    /// Nothing to propagate into
    #[error("no target repositories configured")]
    NoRepositories,

    /// Two targets share one working copy
    #[error("repository {path} is listed more than once")]
    DuplicateRepository { path: PathBuf },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

/// Errors related to IO operations
#[derive(Error, Debug)]
pub enum IoError {
    /// Directory not found
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },
}

impl ManifestError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParseError
    pub fn json_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new XmlParseError
    pub fn xml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::XmlParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new YamlParseError
    pub fn yaml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::YamlParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new UnsupportedLayout error
    pub fn unsupported_layout(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::UnsupportedLayout {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ChecksumError {
    /// Creates a new NetworkError
    pub fn network_error(url: impl Into<String>, message: impl Into<String>) -> Self {
        ChecksumError::NetworkError {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(url: impl Into<String>) -> Self {
        ChecksumError::Timeout { url: url.into() }
    }
}

impl ConfigError {
    /// Creates a new InvalidRule error
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidChange error
    pub fn invalid_change(value: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidChange {
            value: value.into(),
            message: message.into(),
        }
    }
}

impl IoError {
    /// Creates a new DirectoryNotFound error
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        IoError::DirectoryNotFound { path: path.into() }
    }
}
