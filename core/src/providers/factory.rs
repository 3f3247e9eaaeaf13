use crate::config::Config;
use crate::providers::AnthropicProvider;
use crate::traits::Provider;
use anyhow::{Result, anyhow};

const API_KEY_ENV_VARS: &[&str] = &["ANTHROPIC_API_KEY", "PTC_API_KEY"];

pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let api_key = resolve_api_key_with_fallback(API_KEY_ENV_VARS, &config.api_key)?;

    let mut provider = AnthropicProvider::new(api_key)
        .with_model(config.model.clone())
        .with_max_tokens(config.max_tokens)
        .with_betas(config.betas.clone());
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    Ok(Box::new(provider))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    resolve_api_key(env_vars.iter().filter_map(|var| std::env::var(var).ok()), config_key)
        .ok_or_else(|| {
            anyhow!(
                "No API key found. Set {} or run 'ptc onboard'.",
                env_vars.join(" or ")
            )
        })
}

fn resolve_api_key(env_values: impl IntoIterator<Item = String>, config_key: &str) -> Option<String> {
    env_values
        .into_iter()
        .find(|key| !key.trim().is_empty())
        .or_else(|| (!config_key.is_empty()).then(|| config_key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_wins_over_config() {
        let key = resolve_api_key(vec!["sk-env".to_string()], "sk-config");
        assert_eq!(key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn blank_environment_falls_back_to_config() {
        let key = resolve_api_key(vec!["  ".to_string()], "sk-config");
        assert_eq!(key.as_deref(), Some("sk-config"));
    }

    #[test]
    fn no_key_anywhere() {
        assert_eq!(resolve_api_key(Vec::<String>::new(), ""), None);
    }
}
