//! Interactive shell session.

use std::path::Path;
use std::sync::Arc;

use gophkeeper_core::{LocalStore, Vault};
use gophkeeper_sync_engine::{HttpClient, HttpTransport, SyncEngine};
use zeroize::Zeroizing;

use crate::commands::{account, secrets, Command, ShellResult, HELP};

/// The engine type driven by the client.
pub type ClientEngine<C> = SyncEngine<HttpTransport<C>, Arc<LocalStore>>;

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Print the text (if any) and read the next line.
    Continue(String),
    /// Leave the shell.
    Exit,
}

/// An unlocked vault plus the engine that syncs it.
pub struct Shell<C: HttpClient> {
    vault: Vault,
    engine: Arc<ClientEngine<C>>,
    master_password: Zeroizing<String>,
}

impl<C: HttpClient> Shell<C> {
    /// Creates a shell. `master_password` is sent on register and login.
    pub fn new(
        vault: Vault,
        engine: Arc<ClientEngine<C>>,
        master_password: Zeroizing<String>,
    ) -> Self {
        Self {
            vault,
            engine,
            master_password,
        }
    }

    /// Returns the sync engine.
    pub fn engine(&self) -> &Arc<ClientEngine<C>> {
        &self.engine
    }

    /// Parses and runs one input line. May block on the network.
    pub fn execute(&self, line: &str) -> ShellResult<Outcome> {
        let Some(command) = Command::parse(line)? else {
            return Ok(Outcome::Continue(String::new()));
        };
        tracing::debug!(?command, "executing");

        let output = match command {
            Command::Register { login, password } => account::register(
                self.engine.transport(),
                &login,
                &password,
                &self.master_password,
            )?,
            Command::Login { login, password } => account::login(
                self.engine.transport(),
                &login,
                &password,
                &self.master_password,
            )?,
            Command::Set { key, kind, args } => secrets::set(&self.vault, &key, &kind, &args)?,
            Command::Get { key } => secrets::get(&self.vault, &key)?,
            Command::Delete { key } => secrets::delete(&self.vault, &key)?,
            Command::List => secrets::list(&self.vault)?,
            Command::Export { key, path } => secrets::export(&self.vault, &key, Path::new(&path))?,
            Command::Sync => account::sync(self.engine.as_ref())?,
            Command::Status => {
                account::status(self.engine.as_ref(), self.engine.transport().is_authenticated())
            }
            Command::Help => HELP.to_string(),
            Command::Exit => return Ok(Outcome::Exit),
        };
        Ok(Outcome::Continue(output))
    }
}
