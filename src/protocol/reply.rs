use std::fmt::{self, Write};

use crate::error::CommandError;

/// Result of executing a console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  /// Reply to PING
  Pong,
  /// Successful SET or DEL
  Ok,
  /// Value found by GET, GETIDX1 or GETIDX2
  Value(String),
  /// Lookup of an absent key
  Nil,
  /// Command could not be parsed
  Error(String),
}

impl Reply {
  pub fn error(msg: impl Into<String>) -> Self {
    Reply::Error(msg.into())
  }

  pub fn is_error(&self) -> bool {
    matches!(self, Reply::Error(_))
  }

  /// Process exit status for a one-shot command: 1 for an error reply
  pub fn exit_status(&self) -> u8 {
    if self.is_error() { 1 } else { 0 }
  }
}

impl From<Option<String>> for Reply {
  fn from(value: Option<String>) -> Self {
    match value {
      Some(v) => Reply::Value(v),
      None => Reply::Nil,
    }
  }
}

impl From<CommandError> for Reply {
  fn from(err: CommandError) -> Self {
    Reply::Error(err.to_string())
  }
}

impl fmt::Display for Reply {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Reply::Pong => write!(f, "PONG"),
      Reply::Ok => write!(f, "OK"),
      Reply::Value(v) => {
        // Only the quote and the backslash are escaped, everything else is
        // written as stored.
        f.write_char('"')?;
        for c in v.chars() {
          if c == '"' || c == '\\' {
            f.write_char('\\')?;
          }
          f.write_char(c)?;
        }
        f.write_char('"')
      }
      Reply::Nil => write!(f, "(nil)"),
      Reply::Error(e) => write!(f, "(error) ERR {}", e),
    }
  }
}
