//! Error types for the character_palettes library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for character_palettes operations
pub type Result<T> = std::result::Result<T, PaletteError>;

/// Error kinds raised by extraction, table building and similarity scoring
#[derive(Error, Debug)]
pub enum PaletteError {
    /// Image file could not be opened, decoded, or has an unsupported format
    #[error("Failed to read image: {message}")]
    ImageRead {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The image does not have enough distinct colors for the requested clusters
    #[error("Cannot form {requested} clusters from {distinct} distinct colors")]
    Clustering { requested: usize, distinct: usize },

    /// No usable colors remain for a character
    #[error("Empty palette for character '{character}'")]
    EmptyPalette { character: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Per-image processing exceeded the configured limit
    #[error("Processing {} exceeded {limit_ms}ms", path.display())]
    Timeout { path: PathBuf, limit_ms: u64 },

    /// A palette table file could not be parsed
    #[error("Malformed palette table at line {line}: {message}")]
    TableFormat { line: usize, message: String },

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PaletteError {
    /// Create an image read error with context
    pub fn image_read<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageRead {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn empty_palette(character: impl Into<String>) -> Self {
        Self::EmptyPalette {
            character: character.into(),
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Check if a batch run may skip the failing input and continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PaletteError::ImageRead { .. }
                | PaletteError::Clustering { .. }
                | PaletteError::EmptyPalette { .. }
                | PaletteError::Timeout { .. }
        )
    }

    /// Short stable name of the error kind, used in batch summaries
    pub fn kind(&self) -> &'static str {
        match self {
            PaletteError::ImageRead { .. } => "image_read",
            PaletteError::Clustering { .. } => "clustering",
            PaletteError::EmptyPalette { .. } => "empty_palette",
            PaletteError::InvalidParameter { .. } => "invalid_parameter",
            PaletteError::Timeout { .. } => "timeout",
            PaletteError::TableFormat { .. } => "table_format",
            PaletteError::Config { .. } => "config",
            PaletteError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(PaletteError::Clustering { requested: 5, distinct: 2 }.is_recoverable());
        assert!(PaletteError::empty_palette("Hero").is_recoverable());
        assert!(PaletteError::Timeout {
            path: PathBuf::from("a.png"),
            limit_ms: 10
        }
        .is_recoverable());
        assert!(!PaletteError::invalid_parameter("cluster_count", 0).is_recoverable());
        assert!(!PaletteError::TableFormat {
            line: 3,
            message: "bad".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = PaletteError::Clustering { requested: 5, distinct: 2 };
        assert_eq!(err.to_string(), "Cannot form 5 clusters from 2 distinct colors");

        let err = PaletteError::empty_palette("Hero");
        assert_eq!(err.to_string(), "Empty palette for character 'Hero'");
        assert_eq!(err.kind(), "empty_palette");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PaletteError = io.into();
        assert!(matches!(err, PaletteError::Io(_)));
        assert!(!err.is_recoverable());
    }
}
