//! Google Cloud Translation (v2) backend.

use super::{transport_error, ProviderId, TranslationProvider};
use crate::error::GatewayError;
use crate::locale::LocaleCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Form body sent to the v2 `translate` endpoint.
#[derive(Debug, Serialize)]
struct TranslateForm<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
    key: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: Option<TranslateData>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Variant A: a single API key sent in the form body.
pub struct GoogleTranslate {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslate {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslate {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    async fn translate(
        &self,
        text: &str,
        target: &LocaleCode,
        api_key: &str,
    ) -> Result<String, GatewayError> {
        let form = TranslateForm {
            q: text,
            target: target.as_str(),
            format: "html",
            key: api_key,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::Google, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(ProviderId::Google, e))?;

        parse_response(status, &body)
    }
}

fn parse_response(status: reqwest::StatusCode, body: &str) -> Result<String, GatewayError> {
    let parsed: Option<TranslateResponse> = serde_json::from_str(body).ok();

    if let Some(parsed) = parsed {
        if status.is_success() {
            if let Some(first) = parsed
                .data
                .and_then(|data| data.translations.into_iter().next())
            {
                return Ok(first.translated_text);
            }
        }
        if let Some(error) = parsed.error {
            return Err(GatewayError::ProviderRejected(
                error.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
    }

    if !status.is_success() {
        return Err(GatewayError::ProviderRejected(format!(
            "Google API returned HTTP {}",
            status
        )));
    }

    Err(GatewayError::ProviderRejected(
        "Google API response contained no translation".to_string(),
    ))
}
