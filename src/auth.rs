//! Credential resolution.
//!
//! Precedence, highest first:
//! 1. credentials given to the client (a key or a resolver closure)
//! 2. the process-wide value set with [`crate::configure`]
//! 3. the `SUNRA_KEY` environment variable

use crate::config::{configured_credentials, KEY_ENV};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Callback producing a credential on demand.
pub type CredentialsResolver = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Credentials attached to a client.
#[derive(Clone, Default)]
pub enum Credentials {
    /// Fall through to the process-wide configuration and the environment.
    #[default]
    Default,
    Key(String),
    Resolver(CredentialsResolver),
}

impl Credentials {
    pub fn resolve(&self) -> Result<String> {
        self.resolve_with(&KeyEnv::default())
    }

    /// Resolve, reading the last-resort key from `env` instead of the process environment.
    pub fn resolve_with(&self, env: &KeyEnv) -> Result<String> {
        let explicit = match self {
            Credentials::Default => None,
            Credentials::Key(k) => Some(k.clone()),
            Credentials::Resolver(f) => f(),
        };
        resolve_credentials(explicit, configured_credentials, || env.lookup())
    }
}

/// Source of the last-resort key. Reads `SUNRA_KEY` unless replaced.
#[derive(Clone)]
pub struct KeyEnv(CredentialsResolver);

impl KeyEnv {
    pub fn new<F>(lookup: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(lookup))
    }

    pub fn lookup(&self) -> Option<String> {
        (self.0)()
    }
}

impl Default for KeyEnv {
    fn default() -> Self {
        Self::new(|| std::env::var(KEY_ENV).ok())
    }
}

impl fmt::Debug for KeyEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyEnv(..)")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Default => f.write_str("Credentials::Default"),
            Credentials::Key(_) => f.write_str("Credentials::Key(<redacted>)"),
            Credentials::Resolver(_) => f.write_str("Credentials::Resolver(..)"),
        }
    }
}

impl From<&str> for Credentials {
    fn from(key: &str) -> Self {
        Credentials::Key(key.to_string())
    }
}

impl From<String> for Credentials {
    fn from(key: String) -> Self {
        Credentials::Key(key)
    }
}

/// Pick the first non-empty credential from the three sources.
///
/// Lower-priority sources are only consulted when the higher ones yield nothing.
pub fn resolve_credentials(
    explicit: Option<String>,
    configured: impl FnOnce() -> Option<String>,
    env: impl FnOnce() -> Option<String>,
) -> Result<String> {
    let non_empty = |k: Option<String>| k.filter(|k| !k.trim().is_empty());
    non_empty(explicit)
        .or_else(|| non_empty(configured()))
        .or_else(|| non_empty(env()))
        .ok_or_else(|| {
            Error::MissingCredentials(format!(
                "no API key given; pass one to the client, call configure(), or set {}",
                KEY_ENV
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_beats_configured_and_env() {
        let key = resolve_credentials(
            Some("explicit".into()),
            || Some("configured".into()),
            || Some("env".into()),
        )
        .unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn configured_beats_env() {
        let key = resolve_credentials(None, || Some("configured".into()), || Some("env".into()))
            .unwrap();
        assert_eq!(key, "configured");
    }

    #[test]
    fn env_is_last_resort() {
        let key = resolve_credentials(None, || None, || Some("env".into())).unwrap();
        assert_eq!(key, "env");
    }

    #[test]
    fn empty_values_are_skipped() {
        let key = resolve_credentials(Some("".into()), || Some("  ".into()), || Some("env".into()))
            .unwrap();
        assert_eq!(key, "env");
    }

    #[test]
    fn missing_everywhere_fails() {
        let err = resolve_credentials(None, || None, || None).unwrap_err();
        assert!(matches!(err, Error::MissingCredentials(_)));
    }

    #[test]
    fn lower_sources_not_consulted_when_explicit_present() {
        let key = resolve_credentials(
            Some("k".into()),
            || panic!("configured source should not be read"),
            || panic!("env source should not be read"),
        )
        .unwrap();
        assert_eq!(key, "k");
    }

    #[test]
    fn injected_env_replaces_process_environment() {
        let creds = Credentials::Default;
        let key = creds.resolve_with(&KeyEnv::new(|| Some("from-env".into()))).unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn debug_redacts_key() {
        let c = Credentials::from("secret");
        assert!(!format!("{:?}", c).contains("secret"));
    }
}
