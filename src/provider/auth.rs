//! Credential resolution for backends.
//!
//! Resolution order where both are supported: explicit API-key environment
//! variable first, OAuth token cache second. Creating and refreshing the
//! OAuth cache belongs to the login flow, not this crate; we only read it.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::AiError;
use crate::provider::descriptor::{CredentialSource, ProviderDescriptor};

/// A resolved credential, ready for header construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Key(String),
    OauthToken(String),
    None,
}

#[derive(Deserialize)]
struct TokenCache {
    access_token: String,
}

/// Path of the OAuth token cache for one provider.
pub fn oauth_cache_path(provider_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("grapheus").join("oauth").join(format!("{provider_name}.json")))
}

fn read_oauth_token(provider_name: &str) -> Option<String> {
    let path = oauth_cache_path(provider_name)?;
    let raw = std::fs::read_to_string(path).ok()?;
    let cache: TokenCache = serde_json::from_str(&raw).ok()?;
    if cache.access_token.trim().is_empty() {
        None
    } else {
        Some(cache.access_token)
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the credential for a backend.
///
/// Fails with an `authentication`-kind error that names the missing env var
/// and, for OAuth-capable backends, the login command to run.
pub fn resolve(descriptor: &ProviderDescriptor) -> Result<Credential, AiError> {
    match descriptor.credentials {
        CredentialSource::ApiKeyEnv(var) => non_empty_env(var).map(Credential::Key).ok_or_else(|| {
            AiError::authentication(format!(
                "No API key for {}. Set the {var} environment variable.",
                descriptor.name
            ))
        }),
        CredentialSource::OptionalEnv(var) => {
            Ok(non_empty_env(var).map(Credential::Key).unwrap_or(Credential::None))
        }
        CredentialSource::EnvOrOauth { var, login_hint } => {
            if let Some(key) = non_empty_env(var) {
                return Ok(Credential::Key(key));
            }
            if let Some(token) = read_oauth_token(descriptor.name) {
                return Ok(Credential::OauthToken(token));
            }
            Err(AiError::authentication(format!(
                "No credentials for {}. Set {var} or run '{login_hint}'.",
                descriptor.name
            )))
        }
    }
}
