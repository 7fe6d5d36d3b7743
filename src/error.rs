use thiserror::Error;

/// Errors produced while parsing a console command line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unterminated quoted argument")]
    UnterminatedQuote,

    #[error("wrong number of arguments for '{command}' command, expected {expected}")]
    WrongArity {
        command: &'static str,
        expected: usize,
    },

    #[error("invalid argument for '{command}' command: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    #[error("unknown command '{0}'")]
    Unknown(String),
}

/// Errors produced while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
