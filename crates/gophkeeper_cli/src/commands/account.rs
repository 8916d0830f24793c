//! Account and sync commands.

use gophkeeper_sync_engine::{
    HttpClient, HttpTransport, LocalReplica, SyncEngine, SyncTransport,
};

use super::ShellResult;

/// Creates an account and keeps its token.
pub fn register<C: HttpClient>(
    transport: &HttpTransport<C>,
    login: &str,
    password: &str,
    master_password: &str,
) -> ShellResult<String> {
    transport.register(login, password, master_password)?;
    Ok(format!("registered {login}"))
}

/// Logs in and keeps the token.
pub fn login<C: HttpClient>(
    transport: &HttpTransport<C>,
    login: &str,
    password: &str,
    master_password: &str,
) -> ShellResult<String> {
    transport.login(login, password, master_password)?;
    Ok(format!("logged in as {login}"))
}

/// Runs one sync cycle now.
pub fn sync<T: SyncTransport, R: LocalReplica>(engine: &SyncEngine<T, R>) -> ShellResult<String> {
    let result = engine.sync_once()?;
    Ok(format!(
        "pushed {}, discarded {}, pulled {} in {:?}",
        result.pushed, result.discarded, result.pulled, result.duration
    ))
}

/// Describes the engine state and counters.
pub fn status<T: SyncTransport, R: LocalReplica>(
    engine: &SyncEngine<T, R>,
    authenticated: bool,
) -> String {
    let stats = engine.stats();
    let mut lines = vec![
        format!("state: {:?}", engine.state()),
        format!("logged in: {}", if authenticated { "yes" } else { "no" }),
        format!(
            "cycles: {} ok, {} failed",
            stats.cycles_completed, stats.cycles_failed
        ),
        format!(
            "records: {} pushed, {} discarded, {} pulled",
            stats.records_pushed, stats.records_discarded, stats.records_pulled
        ),
    ];
    match stats.last_sync {
        Some(at) => lines.push(format!("last sync: {}", at.to_rfc3339())),
        None => lines.push("last sync: never".to_string()),
    }
    if let Some(error) = stats.last_error {
        lines.push(format!("last error: {error}"));
    }
    lines.join("\n")
}
