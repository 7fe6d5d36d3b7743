use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::client::Client;
use crate::protocol::command::{execute_line, Command};
use crate::protocol::reply::Reply;

pub const PROMPT: &str = "vcache> ";

/// What the console does with one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Blank line, nothing to run
    Skip,
    /// QUIT or EXIT, in any case
    Quit,
    /// A command was run (or failed to parse) and produced this reply
    Reply(Reply),
}

/// Decide and carry out the console action for one line
pub fn handle_line(line: &str, client: &Client) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Skip;
    }
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return LineAction::Quit;
    }
    LineAction::Reply(execute_line(line, client))
}

/// Run a single command given as already split words
pub fn run_once(args: Vec<String>, client: &Client) -> Reply {
    match Command::from_args(args) {
        Ok(cmd) => cmd.execute(client),
        Err(e) => e.into(),
    }
}

/// Read lines from `input` until EOF or QUIT, writing a prompt before each
/// line and one reply line per executed command.
pub async fn run_console<R, W>(input: R, mut output: W, client: &Client) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match handle_line(&line, client) {
            LineAction::Skip => continue,
            LineAction::Quit => break,
            LineAction::Reply(reply) => {
                output.write_all(format!("{}\n", reply).as_bytes()).await?;
            }
        }
    }

    output.flush().await
}
