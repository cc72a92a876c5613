//! DeepL backend.
//!
//! Free-tier keys end in `:fx` and must be sent to the free endpoint; all
//! other keys go to the pro endpoint. DeepL expects its own target codes,
//! which differ from ISO 639-1 for a few locales.

use super::{transport_error, ProviderId, TranslationProvider};
use crate::error::GatewayError;
use crate::locale::LocaleCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Suffix marking a free-tier DeepL key.
const FREE_KEY_SUFFIX: &str = ":fx";

/// Locales whose DeepL code is not just the upper-cased ISO code.
const TARGET_CODE_REMAP: &[(&str, &str)] = &[("en", "EN-US"), ("pt", "PT-PT"), ("zh", "ZH")];

#[derive(Debug, Serialize)]
struct TranslateForm<'a> {
    auth_key: &'a str,
    text: &'a str,
    target_lang: &'a str,
    tag_handling: &'static str,
    preserve_formatting: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

/// Whether `key` is a free-tier key.
pub fn is_free_key(key: &str) -> bool {
    key.ends_with(FREE_KEY_SUFFIX)
}

/// Map a locale to DeepL's `target_lang` code.
pub fn deepl_target_code(locale: &LocaleCode) -> String {
    TARGET_CODE_REMAP
        .iter()
        .find(|(iso, _)| locale.as_str() == *iso)
        .map(|(_, code)| (*code).to_string())
        .unwrap_or_else(|| locale.as_str().to_ascii_uppercase())
}

/// Variant B: tiered keys and remapped locale codes.
pub struct DeepL {
    client: reqwest::Client,
    free_endpoint: String,
    pro_endpoint: String,
}

impl DeepL {
    pub fn new(
        client: reqwest::Client,
        free_endpoint: impl Into<String>,
        pro_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            free_endpoint: free_endpoint.into(),
            pro_endpoint: pro_endpoint.into(),
        }
    }

    fn endpoint_for(&self, key: &str) -> &str {
        if is_free_key(key) {
            &self.free_endpoint
        } else {
            &self.pro_endpoint
        }
    }
}

#[async_trait]
impl TranslationProvider for DeepL {
    fn id(&self) -> ProviderId {
        ProviderId::Deepl
    }

    async fn translate(
        &self,
        text: &str,
        target: &LocaleCode,
        api_key: &str,
    ) -> Result<String, GatewayError> {
        let target_lang = deepl_target_code(target);
        let form = TranslateForm {
            auth_key: api_key,
            text,
            target_lang: &target_lang,
            tag_handling: "html",
            preserve_formatting: "1",
        };

        let response = self
            .client
            .post(self.endpoint_for(api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::Deepl, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(ProviderId::Deepl, e))?;

        let parsed: Option<TranslateResponse> = serde_json::from_str(&body).ok();

        if let Some(parsed) = parsed {
            if status.is_success() {
                if let Some(first) = parsed.translations.into_iter().next() {
                    return Ok(first.text);
                }
            }
            if let Some(message) = parsed.message {
                return Err(GatewayError::ProviderRejected(message));
            }
        }

        if !status.is_success() {
            return Err(GatewayError::ProviderRejected(format!(
                "DeepL API returned HTTP {}",
                status
            )));
        }

        Err(GatewayError::ProviderRejected(
            "DeepL API response contained no translation".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn locale(code: &str) -> LocaleCode {
        LocaleCode::parse(code).unwrap()
    }

    fn provider(server: &MockServer) -> DeepL {
        let client = super::super::http_client(Duration::from_secs(5)).unwrap();
        DeepL::new(
            client,
            format!("{}/free/v2/translate", server.uri()),
            format!("{}/pro/v2/translate", server.uri()),
        )
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "translations": [
                { "detected_source_language": "EN", "text": text }
            ]
        })
    }

    // ==================== Locale Remap Tests ====================

    #[test]
    fn test_target_code_english_gets_region() {
        assert_eq!(deepl_target_code(&locale("en")), "EN-US");
    }

    #[test]
    fn test_target_code_portuguese_gets_region() {
        assert_eq!(deepl_target_code(&locale("pt")), "PT-PT");
    }

    #[test]
    fn test_target_code_chinese_is_bare() {
        assert_eq!(deepl_target_code(&locale("zh")), "ZH");
    }

    #[test]
    fn test_target_code_unmapped_is_uppercased() {
        assert_eq!(deepl_target_code(&locale("de")), "DE");
        assert_eq!(deepl_target_code(&locale("fr")), "FR");
    }

    // ==================== Key Tier Tests ====================

    #[test]
    fn test_is_free_key() {
        assert!(is_free_key("0123-abcd:fx"));
        assert!(!is_free_key("0123-abcd"));
        assert!(!is_free_key("0123:fx-abcd"));
    }

    #[tokio::test]
    async fn test_free_key_uses_free_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/free/v2/translate"))
            .and(body_string_contains("auth_key=abc%3Afx"))
            .and(body_string_contains("target_lang=DE"))
            .and(body_string_contains("tag_handling=html"))
            .and(body_string_contains("preserve_formatting=1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hallo")))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/pro/v2/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("wrong tier")))
            .expect(0)
            .mount(&server)
            .await;

        let result = provider(&server).translate("Hello", &locale("de"), "abc:fx").await;

        assert_eq!(result, Ok("Hallo".to_string()));
    }

    #[tokio::test]
    async fn test_pro_key_uses_pro_endpoint_with_remapped_code() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pro/v2/translate"))
            .and(body_string_contains("target_lang=EN-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hello")))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server)
            .translate("Hola", &locale("en"), "pro-key")
            .await;

        assert_eq!(result, Ok("Hello".to_string()));
    }

    // ==================== Failure Tests ====================

    #[tokio::test]
    async fn test_error_message_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pro/v2/translate"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({ "message": "Wrong endpoint" })),
            )
            .mount(&server)
            .await;

        let result = provider(&server).translate("Hello", &locale("fr"), "key").await;

        assert_eq!(
            result,
            Err(GatewayError::ProviderRejected("Wrong endpoint".to_string()))
        );
    }

    #[tokio::test]
    async fn test_quota_exceeded_status_without_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pro/v2/translate"))
            .respond_with(ResponseTemplate::new(456))
            .mount(&server)
            .await;

        let result = provider(&server).translate("Hello", &locale("fr"), "key").await;

        match result {
            Err(GatewayError::ProviderRejected(message)) => assert!(message.contains("456")),
            other => panic!("Expected ProviderRejected, got {:?}", other),
        }
    }
}
