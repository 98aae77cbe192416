//! Telegram `sendMessage` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tasky_core::UserId;
use tasky_core::traits::{Notifier, SendResult};
use tasky_settings::TelegramSettings;
use tracing::{debug, warn};

use crate::errors::NotifyError;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages to users' private chats through a bot.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    parse_mode: String,
}

impl TelegramNotifier {
    /// Build a notifier from settings. Fails without a bot token.
    pub fn new(settings: &TelegramSettings) -> Result<Self, NotifyError> {
        let token = settings.token().ok_or(NotifyError::MissingToken)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(concat!("tasky/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base = settings.api_base_url.trim_end_matches('/');
        Ok(Self {
            client,
            endpoint: format!("{base}/bot{token}/sendMessage"),
            parse_mode: settings.parse_mode.clone(),
        })
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint embeds the token
        f.debug_struct("TelegramNotifier")
            .field("parse_mode", &self.parse_mode)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user: UserId, text: &str) -> SendResult {
        let body = SendMessageRequest {
            chat_id: user.get(),
            text,
            parse_mode: &self.parse_mode,
        };

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                // reqwest errors carry the URL, which contains the token
                let err = err.without_url();
                warn!(user_id = %user, error = %err, "telegram request failed");
                return SendResult::failed(None, err.to_string());
            }
        };

        let status = response.status();
        let code = status.as_u16();
        let parsed = response.json::<ApiResponse>().await;

        match parsed {
            Ok(api) if status.is_success() && api.ok => {
                debug!(user_id = %user, "message delivered");
                SendResult::ok(code)
            }
            Ok(api) => {
                let error = api.description.unwrap_or_else(|| format!("HTTP {code}"));
                warn!(user_id = %user, status = code, error = %error, "telegram rejected message");
                SendResult::failed(Some(code), error)
            }
            Err(err) => {
                let error = format!("HTTP {code}: unreadable response: {}", err.without_url());
                warn!(user_id = %user, status = code, error = %error, "telegram rejected message");
                SendResult::failed(Some(code), error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn missing_token_is_rejected() {
        let settings = TelegramSettings::default();
        assert_matches!(TelegramNotifier::new(&settings), Err(NotifyError::MissingToken));

        let blank = TelegramSettings {
            bot_token: Some("   ".into()),
            ..Default::default()
        };
        assert_matches!(TelegramNotifier::new(&blank), Err(NotifyError::MissingToken));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let settings = TelegramSettings {
            bot_token: Some("123:abc".into()),
            api_base_url: "http://localhost:9000/".into(),
            ..Default::default()
        };
        let notifier = TelegramNotifier::new(&settings).unwrap();
        assert_eq!(notifier.endpoint, "http://localhost:9000/bot123:abc/sendMessage");
    }

    #[test]
    fn debug_hides_token() {
        let settings = TelegramSettings {
            bot_token: Some("123:secret".into()),
            ..Default::default()
        };
        let notifier = TelegramNotifier::new(&settings).unwrap();
        assert!(!format!("{notifier:?}").contains("secret"));
    }

    #[test]
    fn request_body_shape() {
        let body = SendMessageRequest {
            chat_id: 42,
            text: "<b>hi</b>",
            parse_mode: "HTML",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"chat_id": 42, "text": "<b>hi</b>", "parse_mode": "HTML"})
        );
    }
}
