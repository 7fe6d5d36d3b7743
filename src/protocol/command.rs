use crate::client::Client;
use crate::error::CommandError;
use crate::protocol::parser::Parser;
use crate::protocol::reply::Reply;
use crate::store::{IndexSlot, SecondaryKeys};

/// Console commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// PING
    Ping,
    /// SET key value [IDX1 idx] [IDX2 idx]
    Set {
        key: String,
        value: String,
        secondary: SecondaryKeys,
    },
    /// GET key
    Get { key: String },
    /// GETIDX1 idx
    GetIdx1 { idx: String },
    /// GETIDX2 idx
    GetIdx2 { idx: String },
    /// DEL key
    Del { key: String },
}

impl Command {
    /// Parse a console line into a Command
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        Self::from_args(Parser::tokenize(line)?)
    }

    /// Build a Command from already split arguments, verb first
    pub fn from_args(args: Vec<String>) -> Result<Self, CommandError> {
        let mut args = args.into_iter();
        let name = args.next().ok_or(CommandError::Empty)?;
        let rest: Vec<String> = args.collect();

        match name.to_uppercase().as_str() {
            "PING" => {
                expect_arity("ping", &rest, 0)?;
                Ok(Command::Ping)
            }
            "SET" => parse_set(rest),
            "GET" => {
                let [key] = take::<1>("get", rest)?;
                Ok(Command::Get { key })
            }
            "GETIDX1" => {
                let [idx] = take::<1>("getidx1", rest)?;
                Ok(Command::GetIdx1 { idx })
            }
            "GETIDX2" => {
                let [idx] = take::<1>("getidx2", rest)?;
                Ok(Command::GetIdx2 { idx })
            }
            "DEL" => {
                let [key] = take::<1>("del", rest)?;
                Ok(Command::Del { key })
            }
            _ => Err(CommandError::Unknown(name)),
        }
    }

    /// Execute the command through the given client
    pub fn execute(self, client: &Client) -> Reply {
        match self {
            Command::Ping => {
                client.ping();
                Reply::Pong
            }
            Command::Set {
                key,
                value,
                secondary,
            } => {
                client.set_indexed(key, value, secondary);
                Reply::Ok
            }
            Command::Get { key } => client.lookup(&key).into(),
            Command::GetIdx1 { idx } => client.get_by_index(IndexSlot::One, &idx).into(),
            Command::GetIdx2 { idx } => client.get_by_index(IndexSlot::Two, &idx).into(),
            Command::Del { key } => {
                client.del(&key);
                Reply::Ok
            }
        }
    }
}

/// Parse and execute a console line, turning parse failures into error replies
pub fn execute_line(line: &str, client: &Client) -> Reply {
    match Command::parse(line) {
        Ok(cmd) => cmd.execute(client),
        Err(e) => e.into(),
    }
}

/// SET takes a key and a value, optionally followed by `IDX1 <idx>` and
/// `IDX2 <idx>` in either order, each at most once.
fn parse_set(args: Vec<String>) -> Result<Command, CommandError> {
    if args.len() < 2 || args.len() % 2 != 0 {
        return Err(CommandError::WrongArity {
            command: "set",
            expected: 2,
        });
    }

    let mut args = args.into_iter();
    let (Some(key), Some(value)) = (args.next(), args.next()) else {
        return Err(CommandError::WrongArity {
            command: "set",
            expected: 2,
        });
    };

    let mut secondary = SecondaryKeys::new();
    while let (Some(name), Some(idx)) = (args.next(), args.next()) {
        let slot = match name.to_uppercase().as_str() {
            "IDX1" => &mut secondary.idx1,
            "IDX2" => &mut secondary.idx2,
            _ => {
                return Err(CommandError::InvalidArgument {
                    command: "set",
                    reason: format!("unexpected argument '{}'", name),
                });
            }
        };
        if slot.is_some() {
            return Err(CommandError::InvalidArgument {
                command: "set",
                reason: format!("'{}' given more than once", name.to_uppercase()),
            });
        }
        *slot = Some(idx);
    }

    Ok(Command::Set {
        key,
        value,
        secondary,
    })
}

fn expect_arity(command: &'static str, args: &[String], expected: usize) -> Result<(), CommandError> {
    if args.len() != expected {
        return Err(CommandError::WrongArity { command, expected });
    }
    Ok(())
}

fn take<const N: usize>(command: &'static str, args: Vec<String>) -> Result<[String; N], CommandError> {
    args.try_into()
        .map_err(|_| CommandError::WrongArity { command, expected: N })
}
