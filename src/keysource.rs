//! Key resolution
//!
//! The transform itself only sees a constructed [`crate::cipher::Cipher`];
//! where the key string comes from is this module's job. Resolvers cover an
//! explicit caller-supplied key, the configured key (environment variable or
//! key file), an arbitrary reader, and an interactive no-echo prompt, and
//! can be chained so config sources fall through to the prompt.

use crate::error::{ErrorCategory, ErrorKind, RelockError, Result};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Environment variable consulted before the key file.
pub const KEY_ENV_VAR: &str = "RELOCK_KEY";

/// Trait for resolving the encryption key from various sources
pub trait KeyResolver {
    /// Resolve the key string to encrypt or decrypt with.
    ///
    /// Returns the key wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn resolve_key(&mut self) -> Result<Zeroizing<String>>;
}

/// Returns a fixed key supplied by the caller (e.g. a command-line flag)
pub struct ExplicitKeyResolver {
    key: Zeroizing<String>,
}

impl ExplicitKeyResolver {
    pub fn new(key: String) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }
}

impl KeyResolver for ExplicitKeyResolver {
    fn resolve_key(&mut self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new((*self.key).clone()))
    }
}

/// Resolves the configured key: environment variable first, key file second.
///
/// The key file holds the key on its first line; a trailing newline is not
/// part of the key.
pub struct ConfigKeyResolver {
    env_var: String,
    key_path: Option<PathBuf>,
}

impl ConfigKeyResolver {
    /// Resolver over explicit sources, primarily for tests.
    pub fn new(env_var: impl Into<String>, key_path: Option<PathBuf>) -> Self {
        Self {
            env_var: env_var.into(),
            key_path,
        }
    }

    /// Resolver over the standard sources: `RELOCK_KEY`, then
    /// `<config-dir>/relock/key`.
    pub fn standard() -> Self {
        Self {
            env_var: KEY_ENV_VAR.to_string(),
            key_path: dirs::config_dir().map(|dir| dir.join("relock").join("key")),
        }
    }

    fn unavailable(&self) -> RelockError {
        let path_hint = match &self.key_path {
            Some(path) => path.display().to_string(),
            None => "<no config directory>".to_string(),
        };
        RelockError::with_kind(
            ErrorCategory::User,
            ErrorKind::ConfigUnavailable,
            format!(
                "no key configured: set {} or create {}",
                self.env_var, path_hint
            ),
        )
    }
}

impl KeyResolver for ConfigKeyResolver {
    fn resolve_key(&mut self) -> Result<Zeroizing<String>> {
        if let Ok(key) = std::env::var(&self.env_var) {
            if !key.is_empty() {
                return Ok(Zeroizing::new(key));
            }
        }

        let Some(path) = &self.key_path else {
            return Err(self.unavailable());
        };

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => Zeroizing::new(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(self.unavailable()),
            Err(e) => {
                return Err(RelockError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to read key file {}", path.display()),
                    e,
                ));
            }
        };

        let key = contents.lines().next().unwrap_or("");
        if key.is_empty() {
            return Err(self.unavailable());
        }
        Ok(Zeroizing::new(key.to_string()))
    }
}

/// Reads the key from any io::Read source
pub struct ReaderKeyResolver {
    reader: Box<dyn Read>,
}

impl ReaderKeyResolver {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl KeyResolver for ReaderKeyResolver {
    fn resolve_key(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(String::new());
        self.reader.read_to_string(&mut data).map_err(|e| {
            RelockError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::KeyUnavailable,
                format!("error reading key: {}", e),
                e,
            )
        })?;
        // A trailing newline from `echo key | relock ...` is not part of the key.
        let key = data.trim_end_matches(['\n', '\r']);
        Ok(Zeroizing::new(key.to_string()))
    }
}

/// Reads the key from the terminal with no echo
pub struct TerminalKeyResolver;

impl TerminalKeyResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalKeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyResolver for TerminalKeyResolver {
    fn resolve_key(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(RelockError::with_kind(
                ErrorCategory::User,
                ErrorKind::KeyUnavailable,
                "cannot read key from terminal - stdin is not a terminal",
            ));
        }

        io::stderr().write_all(b"Key (relock): ").map_err(|e| {
            RelockError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            RelockError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read key *without echo*
        let key = rpassword::read_password().map_err(|e| {
            RelockError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::KeyUnavailable,
                format!("failure reading key: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(key))
    }
}

/// Tries resolvers in order until one produces a key.
///
/// Only a `ConfigUnavailable` failure falls through to the next resolver;
/// any other failure propagates immediately so I/O problems and refusals
/// are not papered over.
pub struct ChainedKeyResolver {
    resolvers: Vec<Box<dyn KeyResolver>>,
}

impl ChainedKeyResolver {
    pub fn new(resolvers: Vec<Box<dyn KeyResolver>>) -> Self {
        Self { resolvers }
    }
}

impl KeyResolver for ChainedKeyResolver {
    fn resolve_key(&mut self) -> Result<Zeroizing<String>> {
        for resolver in &mut self.resolvers {
            match resolver.resolve_key() {
                Ok(key) => return Ok(key),
                Err(e) if e.kind == Some(ErrorKind::ConfigUnavailable) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(RelockError::with_kind(
            ErrorCategory::User,
            ErrorKind::ConfigUnavailable,
            "no key available from any configured source",
        ))
    }
}
