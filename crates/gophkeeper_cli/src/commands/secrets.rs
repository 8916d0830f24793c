//! Vault commands: set, get, delete, list, export.

use std::fs;
use std::path::Path;

use gophkeeper_codec::from_user_input;
use gophkeeper_core::Vault;

use super::{ShellError, ShellResult};

/// Builds, validates and stores a secret.
pub fn set(vault: &Vault, key: &str, kind: &str, args: &[String]) -> ShellResult<String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let secret = from_user_input(kind, &args)?;
    vault.put(key, &secret)?;
    Ok(format!("stored {key} ({})", secret.kind()))
}

/// Shows a secret.
pub fn get(vault: &Vault, key: &str) -> ShellResult<String> {
    Ok(vault.get(key)?.to_string())
}

/// Deletes a secret.
pub fn delete(vault: &Vault, key: &str) -> ShellResult<String> {
    vault.delete(key)?;
    Ok(format!("deleted {key}"))
}

/// Lists live keys, one per line.
pub fn list(vault: &Vault) -> ShellResult<String> {
    let keys = vault.list()?;
    if keys.is_empty() {
        return Ok("(no secrets)".to_string());
    }
    Ok(keys.join("\n"))
}

/// Writes the contents of a binary secret to `path`.
pub fn export(vault: &Vault, key: &str, path: &Path) -> ShellResult<String> {
    let secret = vault.get(key)?;
    let bytes = secret.as_bytes().ok_or_else(|| {
        ShellError::usage(format!("{key} is a {} secret, not binary", secret.kind()))
    })?;
    fs::write(path, bytes)?;
    Ok(format!("wrote {} bytes to {}", bytes.len(), path.display()))
}
