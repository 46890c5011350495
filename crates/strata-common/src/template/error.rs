//! Template error types

use std::fmt;

/// Errors that can occur during template operations
#[derive(Debug)]
pub enum TemplateError {
    /// Template rendering failed
    Render {
        /// Template name, usually the source file name
        template: String,
        /// The underlying minijinja error
        source: minijinja::Error,
    },
    /// Context could not be converted into template values
    Context(String),
}

impl TemplateError {
    /// Create a render error for a named template
    pub fn render(template: impl Into<String>, source: minijinja::Error) -> Self {
        Self::Render {
            template: template.into(),
            source,
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render { template, source } => {
                write!(f, "failed to render {}: {:#}", template, source)
            }
            Self::Context(msg) => write!(f, "invalid template context: {}", msg),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render { source, .. } => Some(source),
            Self::Context(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error_display() {
        let err = TemplateError::Context("root must be an object".to_string());
        assert!(err.to_string().contains("invalid template context"));
        assert!(err.to_string().contains("root must be an object"));
    }
}
