use crate::error::CommandError;

/// Tokenizer for console command lines
///
/// Arguments are separated by whitespace. A double-quoted argument may
/// contain whitespace and may be empty.
pub struct Parser;

impl Parser {
  /// Split a line into arguments
  pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = line.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
      if c.is_whitespace() {
        chars.next();
        continue;
      }

      if c == '"' {
        chars.next();
        let mut token = String::new();
        loop {
          match chars.next() {
            Some('"') => break,
            Some(ch) => token.push(ch),
            None => return Err(CommandError::UnterminatedQuote),
          }
        }
        tokens.push(token);
      } else {
        let mut token = String::new();
        while let Some(&ch) = chars.peek() {
          if ch.is_whitespace() {
            break;
          }
          token.push(ch);
          chars.next();
        }
        tokens.push(token);
      }
    }

    Ok(tokens)
  }
}
