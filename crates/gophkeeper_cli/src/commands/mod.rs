//! Shell command parsing and implementations.

pub mod account;
pub mod secrets;

use gophkeeper_codec::CodecError;
use gophkeeper_core::CoreError;
use gophkeeper_sync_engine::SyncError;
use thiserror::Error;

/// Help text printed by `help`.
pub const HELP: &str = "\
commands:
  register <login> <password>     create an account and log in
  login <login> <password>        log in to an existing account
  set <key> <type> <args..>       store a secret
      login_password <login> <password>
      text <text..>
      binary <file>
      card <number> <holder> <month> <year> <cvc>
  get <key>                       show a secret
  delete <key>                    delete a secret
  list                            list secret keys
  export <key> <file>             write a binary secret to a file
  sync                            run a sync cycle now
  status                          show sync status
  help                            show this help
  exit | quit                     leave";

/// Errors reported back to the shell user.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Wrong command or arguments.
    #[error("{0}")]
    Usage(String),

    /// Secret input or decoding error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Vault error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Sync or account error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// File error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}

/// Result type for shell commands.
pub type ShellResult<T> = Result<T, ShellError>;

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `register <login> <password>`
    Register {
        /// Account login.
        login: String,
        /// Account password.
        password: String,
    },
    /// `login <login> <password>`
    Login {
        /// Account login.
        login: String,
        /// Account password.
        password: String,
    },
    /// `set <key> <type> <args..>`
    Set {
        /// Secret key.
        key: String,
        /// Secret type name.
        kind: String,
        /// Type specific arguments.
        args: Vec<String>,
    },
    /// `get <key>`
    Get {
        /// Secret key.
        key: String,
    },
    /// `delete <key>`
    Delete {
        /// Secret key.
        key: String,
    },
    /// `list`
    List,
    /// `export <key> <file>`
    Export {
        /// Secret key.
        key: String,
        /// Destination file.
        path: String,
    },
    /// `sync`
    Sync,
    /// `status`
    Status,
    /// `help`
    Help,
    /// `exit` or `quit`
    Exit,
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> ShellResult<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match name {
            "register" | "login" => {
                let [login, password] = exact::<2>(name, &args)?;
                let (login, password) = (login.to_string(), password.to_string());
                if name == "register" {
                    Command::Register { login, password }
                } else {
                    Command::Login { login, password }
                }
            }
            "set" => {
                if args.len() < 2 {
                    return Err(ShellError::usage("usage: set <key> <type> <args..>"));
                }
                Command::Set {
                    key: args[0].to_string(),
                    kind: args[1].to_string(),
                    args: args[2..].iter().map(|s| s.to_string()).collect(),
                }
            }
            "get" => {
                let [key] = exact::<1>(name, &args)?;
                Command::Get { key: key.to_string() }
            }
            "delete" => {
                let [key] = exact::<1>(name, &args)?;
                Command::Delete { key: key.to_string() }
            }
            "export" => {
                let [key, path] = exact::<2>(name, &args)?;
                Command::Export {
                    key: key.to_string(),
                    path: path.to_string(),
                }
            }
            "list" => no_args(name, &args, Command::List)?,
            "sync" => no_args(name, &args, Command::Sync)?,
            "status" => no_args(name, &args, Command::Status)?,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => {
                return Err(ShellError::usage(format!(
                    "unknown command {other:?}, type `help`"
                )))
            }
        };
        Ok(Some(command))
    }
}

fn exact<'a, const N: usize>(name: &str, args: &[&'a str]) -> ShellResult<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| {
        ShellError::usage(format!(
            "{name} takes {N} argument(s), got {}",
            args.len()
        ))
    })
}

fn no_args(name: &str, args: &[&str], command: Command) -> ShellResult<Command> {
    if !args.is_empty() {
        return Err(ShellError::usage(format!("{name} takes no arguments")));
    }
    Ok(command)
}
