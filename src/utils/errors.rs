use std::path::PathBuf;
use thiserror::Error;

/// Location context for manifest and config errors
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Violations of the module graph precondition, detected while building the graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("module '{0}' is declared more than once")]
    DuplicateModule(String),

    #[error("dependency edge '{from}' -> '{to}' points at an unknown module")]
    DanglingEdge { from: String, to: String },
}

#[derive(Error, Debug)]
pub enum SokuError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Module graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl SokuError {
    /// Create a simple parse error without context
    pub fn parse(message: String) -> Self {
        Self::Parse {
            message,
            context: None,
        }
    }

    /// Create a parse error with context
    pub fn parse_with_context(message: String, context: ErrorContext) -> Self {
        Self::Parse {
            message,
            context: Some(context),
        }
    }

    /// Wrap a serde_json failure, keeping the line/column it reports
    pub fn from_json(err: serde_json::Error, path: PathBuf) -> Self {
        let context = ErrorContext::new()
            .with_file(path)
            .with_location(err.line(), err.column());
        Self::parse_with_context(err.to_string(), context)
    }

    /// Create a configuration error
    pub fn config(message: String) -> Self {
        Self::Config(message)
    }

    /// Format error with enhanced context display
    pub fn format_detailed(&self) -> String {
        match self {
            SokuError::Parse { message, context } => {
                let mut output = format!("❌ Parse Error: {}", message);

                if let Some(ctx) = context {
                    if let Some(ref file_path) = ctx.file_path {
                        output.push_str(&format!("\n📁 File: {}", file_path.display()));
                    }

                    if let (Some(line), Some(column)) = (ctx.line, ctx.column) {
                        output.push_str(&format!("\n📍 Location: line {}, column {}", line, column));
                    }
                }

                output
            }
            _ => format!("❌ {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SokuError>;

impl From<regex::Error> for SokuError {
    fn from(err: regex::Error) -> Self {
        SokuError::config(format!("Invalid module filter: {}", err))
    }
}

impl From<serde_json::Error> for SokuError {
    fn from(err: serde_json::Error) -> Self {
        SokuError::parse(err.to_string())
    }
}

impl From<anyhow::Error> for SokuError {
    fn from(err: anyhow::Error) -> Self {
        SokuError::Other(err.to_string())
    }
}
