//! Process configuration, read from environment variables.
//!
//! Every option is independently optional; an empty value counts as unset.
//! Tests build configs through [`AppConfig::from_lookup`] with a map instead
//! of touching the real environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::pipeline::types::DEFAULT_MAX_BODY_CHARS;
use crate::transport::smtp::{DEFAULT_PORT, SmtpConfig, SmtpSecurity};

/// Telegram channel settings. Both token and chat id are required.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
    pub api_base: Option<String>,
}

/// Everything the process needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Mailbox that receives an unchanged copy; `None` disables forwarding.
    pub forward_to: Option<String>,
    /// Relay used for forwarding. Always set when `forward_to` is.
    pub smtp: Option<SmtpConfig>,
    /// Summary providers, in the order they are tried.
    pub providers: Vec<LlmConfig>,
    pub wecom_webhook_url: Option<String>,
    pub telegram: Option<TelegramConfig>,
    /// Body cap (in characters) for the summary request.
    pub max_body_chars: usize,
    /// Per-request timeout for provider and channel calls.
    pub http_timeout: Duration,
    /// How long the binary waits for detached notifications before exiting.
    pub notify_grace: Duration,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let http_timeout = Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 30u64)?);

        let mut forward_to = get("FORWARD_TO");
        let smtp = match get("FORWARD_SMTP_HOST") {
            Some(host) => {
                let mut smtp = SmtpConfig::new(host);
                smtp.port = parse_or(&get, "FORWARD_SMTP_PORT", DEFAULT_PORT)?;
                smtp.security = match get("FORWARD_SMTP_SECURITY") {
                    Some(mode) => mode.parse::<SmtpSecurity>()?,
                    None => SmtpSecurity::default(),
                };
                smtp.username = get("FORWARD_SMTP_USERNAME");
                smtp.password = get("FORWARD_SMTP_PASSWORD").map(SecretString::from);
                smtp.envelope_from = get("FORWARD_ENVELOPE_FROM");
                smtp.timeout = http_timeout;
                Some(smtp)
            }
            None => None,
        };
        // Notifications must still go out, so a destination without a relay
        // only turns forwarding off.
        if let Some(destination) = &forward_to
            && smtp.is_none()
        {
            tracing::error!(
                destination = %destination,
                "FORWARD_TO is set but FORWARD_SMTP_HOST is not; forwarding disabled"
            );
            forward_to = None;
        }

        let providers = provider_chain(&get, http_timeout)?;

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                bot_token: SecretString::from(token),
                chat_id,
                api_base: get("TELEGRAM_API_BASE"),
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("Telegram needs both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID; disabled");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            forward_to,
            smtp,
            providers,
            wecom_webhook_url: get("WECOM_WEBHOOK_URL"),
            telegram,
            max_body_chars: parse_or(&get, "SUMMARY_MAX_BODY_CHARS", DEFAULT_MAX_BODY_CHARS)?,
            http_timeout,
            notify_grace: Duration::from_secs(parse_or(&get, "NOTIFY_GRACE_SECS", 30u64)?),
        })
    }

    /// Shared HTTP client for providers and channels.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }

    /// Log what is enabled, without secrets.
    pub fn log_summary(&self) {
        let chain: Vec<String> = self
            .providers
            .iter()
            .map(|p| format!("{}/{}", p.backend, p.model))
            .collect();
        tracing::info!(
            providers = %chain.join(","),
            wecom = self.wecom_webhook_url.is_some(),
            telegram = self.telegram.is_some(),
            forward_to = self.forward_to.as_deref().unwrap_or("-"),
            "Configuration loaded"
        );
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

fn provider_chain<G>(get: &G, timeout: Duration) -> Result<Vec<LlmConfig>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let backends = match get("SUMMARY_PROVIDERS") {
        Some(list) => {
            let backends = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<LlmBackend>)
                .collect::<Result<Vec<_>, _>>()?;
            if backends.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "SUMMARY_PROVIDERS".into(),
                    message: "no providers listed".into(),
                });
            }
            backends
        }
        None => LlmBackend::DEFAULT_ORDER.to_vec(),
    };

    Ok(backends
        .into_iter()
        .map(|backend| {
            let mut config = LlmConfig::new(backend);
            let (key_var, model_var, url_var) = match backend {
                LlmBackend::WorkersAi => {
                    config.account_id = get("CF_ACCOUNT_ID");
                    ("CF_API_TOKEN", "AI_MODEL", "WORKERS_AI_BASE_URL")
                }
                LlmBackend::OpenAi => ("OPENAI_API_KEY", "OPENAI_MODEL", "OPENAI_BASE_URL"),
                LlmBackend::Anthropic => {
                    ("ANTHROPIC_API_KEY", "ANTHROPIC_MODEL", "ANTHROPIC_BASE_URL")
                }
            };
            config.api_key = get(key_var).map(SecretString::from);
            if let Some(model) = get(model_var) {
                config.model = model;
            }
            config.base_url = get(url_var);
            config.timeout = timeout;
            config
        })
        .collect())
}
