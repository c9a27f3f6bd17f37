pub mod openai;
pub mod traits;

pub use openai::OpenAiProvider;
pub use traits::Provider;

use crate::config::ProviderConfig;
use crate::util::truncate_with_ellipsis;
use std::sync::Arc;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Build an error from a non-success response: provider, status, and a
/// trimmed body with anything that looks like a key masked out.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response body>".into());
    anyhow::anyhow!("{provider} API error ({status}): {}", sanitize_api_error(&body))
}

pub fn sanitize_api_error(body: &str) -> String {
    let scrubbed: Vec<&str> = body
        .split_whitespace()
        .map(|word| {
            let bare = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-');
            if bare.starts_with("sk-") && bare.len() > 8 {
                "[REDACTED]"
            } else {
                word
            }
        })
        .collect();
    truncate_with_ellipsis(&scrubbed.join(" "), MAX_ERROR_BODY_CHARS)
}

/// Factory: build the configured provider. `Ok(None)` means summaries are
/// switched off (no name, or neither a key nor a custom endpoint).
pub fn create_provider(config: &ProviderConfig) -> anyhow::Result<Option<Arc<dyn Provider>>> {
    let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
    let base_url = config.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty());

    match config.name.trim() {
        "" | "none" => Ok(None),
        "openai" | "openai-compatible" | "custom" => {
            if api_key.is_none() && base_url.is_none() {
                tracing::info!("No provider API key configured; chat summaries disabled");
                return Ok(None);
            }
            let provider = OpenAiProvider::with_base_url(base_url, Some(api_key.unwrap_or_default()))
                .with_max_tokens(config.max_tokens)
                .with_timeout(Duration::from_secs(config.timeout_secs.max(1)));
            Ok(Some(Arc::new(provider)))
        }
        other => anyhow::bail!(
            "Unknown provider '{other}'. Supported: openai (or any OpenAI-compatible base_url), none"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, key: Option<&str>, base_url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: name.into(),
            api_key: key.map(Into::into),
            base_url: base_url.map(Into::into),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn factory_openai_with_key() {
        assert!(create_provider(&config("openai", Some("sk-x"), None)).unwrap().is_some());
    }

    #[test]
    fn factory_without_key_or_endpoint_is_disabled() {
        assert!(create_provider(&config("openai", None, None)).unwrap().is_none());
        assert!(create_provider(&config("openai", Some("  "), None)).unwrap().is_none());
        assert!(create_provider(&config("none", Some("sk-x"), None)).unwrap().is_none());
    }

    #[test]
    fn factory_local_endpoint_needs_no_key() {
        let p = create_provider(&config("custom", None, Some("http://127.0.0.1:11434/v1")))
            .unwrap()
            .unwrap();
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn factory_unknown_name_is_an_error() {
        let err = create_provider(&config("nonexistent", Some("k"), None))
            .err()
            .expect("unknown provider should fail");
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn sanitize_masks_keys_and_truncates() {
        let out = sanitize_api_error("Incorrect API key provided: sk-abcdef123456. See docs.");
        assert!(!out.contains("sk-abcdef123456"));
        assert!(out.contains("[REDACTED]"));

        let long = "x".repeat(1000);
        assert!(sanitize_api_error(&long).chars().count() <= MAX_ERROR_BODY_CHARS + 3);
    }
}
