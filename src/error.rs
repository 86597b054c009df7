use thiserror::Error;

/// Main error type for Paper X-Ray
#[derive(Error, Debug)]
pub enum XrayError {
    #[error("Failed to decode document: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("No API key configured")]
    MissingCredential,

    #[error("Analysis request failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Analysis service returned an unusable response: {message}")]
    Service { message: String },

    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("Selection capture failed: {message}")]
    Capture { message: String },

    #[error("Image encoding failed")]
    Encode(#[from] image::ImageError),

    #[error("File I/O error: {path}")]
    FileIO {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl XrayError {
    /// Create a decode error with context
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// Create a decode error with source
    pub fn decode_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn render(page: usize, message: impl Into<String>) -> Self {
        Self::Render {
            page,
            message: message.into(),
        }
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Create a file I/O error
    pub fn file_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileIO {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Get user-friendly error message for the status bar
    pub fn user_message(&self) -> String {
        match self {
            XrayError::Decode { .. } => {
                "Couldn't open this PDF. It might be encrypted or corrupted.".to_string()
            }
            XrayError::PageOutOfRange { page, page_count } => {
                format!("Page {} doesn't exist (document has {} pages).", page, page_count)
            }
            XrayError::MissingCredential => {
                "No API key configured. Press K to set one up.".to_string()
            }
            XrayError::Render { page, .. } => format!("Page {} could not be rendered.", page),
            XrayError::Capture { message } => format!("Selection not captured: {}", message),
            XrayError::FileIO { path, .. } => format!("File access error: {}", path),
            XrayError::Configuration { message } => format!("Bad configuration: {}", message),
            _ => "Something went wrong. Check the logs for details.".to_string(),
        }
    }
}

/// Result type alias for convenience
pub type XrayResult<T> = Result<T, XrayError>;

/// Error context for adding additional information
pub trait ErrorContext<T> {
    fn with_path(self, path: &std::path::Path) -> XrayResult<T>;
}

impl<T> ErrorContext<T> for Result<T, std::io::Error> {
    fn with_path(self, path: &std::path::Path) -> XrayResult<T> {
        self.map_err(|e| XrayError::file_io(path.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_points_at_key_prompt() {
        let err = XrayError::MissingCredential;
        assert!(err.user_message().contains("API key"));
    }

    #[test]
    fn test_io_context_keeps_path() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.with_path(std::path::Path::new("/tmp/paper.pdf")).unwrap_err();
        assert!(matches!(err, XrayError::FileIO { ref path, .. } if path == "/tmp/paper.pdf"));
        assert_eq!(err.user_message(), "File access error: /tmp/paper.pdf");
    }
}
