pub mod storage;

pub use storage::{AuthStorage, Credential};

use anyhow::{Context, Result, bail};

use crate::config::ConfigError;

/// Providers that accept a stored secret, with the environment variable
/// consulted when nothing is stored.
pub const PROVIDERS: &[(&str, &str)] = &[
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("groq", "GROQ_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
    ("telegram", "TELEGRAM_BOT_TOKEN"),
];

pub fn env_var_for(provider: &str) -> Option<&'static str> {
    PROVIDERS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, var)| *var)
}

/// Store a secret for a provider.
///
/// Shared by `troupe login` and anything else that needs to seed credentials.
pub fn login(db_path: &str, provider: &str, secret: &str) -> Result<()> {
    if env_var_for(provider).is_none() {
        bail!("unsupported provider: {provider}");
    }
    let secret = secret.trim();
    if secret.is_empty() {
        bail!("no key provided for {provider}");
    }
    let credential = if provider == "telegram" {
        Credential::BotToken {
            token: secret.to_string(),
        }
    } else {
        Credential::ApiKey {
            key: secret.to_string(),
        }
    };
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .set(provider, credential)
        .context("failed to save credentials")?;
    Ok(())
}

pub fn logout(db_path: &str, provider: &str) -> Result<()> {
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .remove(provider)
        .context("failed to remove credentials")?;
    Ok(())
}

/// Resolve a provider's secret or fail with [`ConfigError::MissingSecret`].
pub fn require_secret(storage: &AuthStorage, provider: &str) -> Result<String> {
    let env_var = env_var_for(provider)
        .with_context(|| format!("unsupported provider: {provider}"))?;
    storage.get_secret(provider, env_var)?.ok_or_else(|| {
        ConfigError::MissingSecret {
            name: provider.to_string(),
            env_var: env_var.to_string(),
        }
        .into()
    })
}

/// Human-readable status line for the banner.
pub fn status(storage: &AuthStorage, provider: &str) -> Result<String> {
    let Some(env_var) = env_var_for(provider) else {
        return Ok("N/A".to_string());
    };
    if storage.get(provider)?.is_some() {
        return Ok("stored key ✓".to_string());
    }
    let from_env = std::env::var(env_var)
        .map(|k| !k.is_empty())
        .unwrap_or(false);
    Ok(if from_env {
        format!("{env_var} ✓")
    } else {
        "not authenticated".to_string()
    })
}
