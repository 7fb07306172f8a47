// ============================================
// src/services/translate.rs
// 英語 → 日本語の機械翻訳（DeepL / Google）
// ============================================

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

const DEEPL_FREE_URL: &str = "https://api-free.deepl.com/v2/translate";
const DEEPL_PRO_URL: &str = "https://api.deepl.com/v2/translate";
const GOOGLE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// DeepL が使い切りを知らせるステータス
const DEEPL_QUOTA_STATUS: u16 = 456;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("DeepL APIキーが設定されていません。設定画面でAPIキーを設定してください")]
    MissingApiKey,

    #[error("DeepL APIキーが無効です。正しいAPIキーを設定してください")]
    Unauthorized,

    #[error("DeepL APIの月間制限に達しました")]
    QuotaExceeded,

    #[error("{engine}翻訳に失敗しました: HTTP {status}")]
    Status { engine: &'static str, status: StatusCode },

    #[error("{engine}翻訳に失敗しました: {source}")]
    Http {
        engine: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}翻訳の結果が空でした")]
    EmptyResult(&'static str),
}

/// 翻訳エンジン
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;
    fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Engine {
    #[default]
    Deepl,
    Google,
}

impl Engine {
    pub fn label(self) -> &'static str {
        match self {
            Engine::Deepl => "DeepL",
            Engine::Google => "Google",
        }
    }
}

/// エンジン種別と設定から翻訳器を作る
pub fn translator_for(engine: Engine, deepl_api_key: &str) -> Box<dyn Translator> {
    match engine {
        Engine::Deepl => Box::new(DeepLTranslator::new(deepl_api_key)),
        Engine::Google => Box::new(GoogleTranslator::new()),
    }
}

// --------------------------------------------------
// 前処理
// --------------------------------------------------

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// 送る前に整える: 前後の空白除去、CRLF→LF、空行つぶし、連続空白を1つに
pub fn clean_text(text: &str) -> String {
    let text = text.trim().replace("\r\n", "\n");
    let text = BLANK_LINES.replace_all(&text, "\n");
    SPACES.replace_all(&text, " ").into_owned()
}

fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

// --------------------------------------------------
// DeepL
// --------------------------------------------------

pub struct DeepLTranslator {
    api_key: String,
    client: Client,
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

impl DeepLTranslator {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            client: http_client(),
        }
    }

    /// 無料プランのキーは `:fx` で終わる
    fn endpoint(&self) -> &'static str {
        if self.api_key.ends_with(":fx") {
            DEEPL_FREE_URL
        } else {
            DEEPL_PRO_URL
        }
    }
}

impl Translator for DeepLTranslator {
    fn name(&self) -> &'static str {
        "DeepL"
    }

    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        if self.api_key.is_empty() {
            return Err(TranslateError::MissingApiKey);
        }
        let cleaned = clean_text(text);
        let http = |source| TranslateError::Http {
            engine: "DeepL",
            source,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&[
                ("text", cleaned.as_str()),
                ("target_lang", "JA"),
                // 文の分割をしない（カンマで切られるのを防ぐ）
                ("split_sentences", "0"),
                ("preserve_formatting", "1"),
            ])
            .send()
            .map_err(http)?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => return Err(TranslateError::Unauthorized),
            DEEPL_QUOTA_STATUS => return Err(TranslateError::QuotaExceeded),
            _ if !status.is_success() => {
                return Err(TranslateError::Status {
                    engine: "DeepL",
                    status,
                });
            }
            _ => {}
        }

        let body: DeepLResponse = response.json().map_err(http)?;
        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(TranslateError::EmptyResult("DeepL"))
    }
}

// --------------------------------------------------
// Google（公開エンドポイント）
// --------------------------------------------------

pub struct GoogleTranslator {
    client: Client,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// `[[["訳","原文",...], ...], ...]` の先頭要素の訳文をつなげる
fn parse_google_response(body: &serde_json::Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let joined: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(|s| s.as_str()))
        .collect();
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

impl Translator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "Google"
    }

    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let cleaned = clean_text(text);
        let http = |source| TranslateError::Http {
            engine: "Google",
            source,
        };

        let response = self
            .client
            .get(GOOGLE_URL)
            .query(&[
                ("client", "gtx"),
                ("sl", "en"),
                ("tl", "ja"),
                ("dt", "t"),
                ("q", cleaned.as_str()),
            ])
            .send()
            .map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status {
                engine: "Google",
                status,
            });
        }

        let body: serde_json::Value = response.json().map_err(http)?;
        parse_google_response(&body).ok_or(TranslateError::EmptyResult("Google"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cleans_whitespace() {
        assert_eq!(clean_text("  hello \t  world  "), "hello world");
        assert_eq!(clean_text("a\r\n\r\n\r\nb"), "a\nb");
        assert_eq!(clean_text("line one\n   \nline two"), "line one\nline two");
    }

    #[test]
    fn deepl_endpoint_follows_key_plan() {
        assert_eq!(DeepLTranslator::new("abc:fx").endpoint(), DEEPL_FREE_URL);
        assert_eq!(DeepLTranslator::new("abc").endpoint(), DEEPL_PRO_URL);
    }

    #[test]
    fn deepl_without_key_fails_before_network() {
        let err = DeepLTranslator::new("   ").translate("hello").unwrap_err();
        assert!(matches!(err, TranslateError::MissingApiKey));
    }

    #[test]
    fn google_response_segments_are_joined() {
        let body = json!([[["こんにちは。", "Hello.", null], ["元気ですか？", "How are you?", null]], null, "en"]);
        assert_eq!(
            parse_google_response(&body).as_deref(),
            Some("こんにちは。元気ですか？")
        );
        assert_eq!(parse_google_response(&json!([[]])), None);
        assert_eq!(parse_google_response(&json!({})), None);
    }

    #[test]
    fn engine_labels() {
        assert_eq!(translator_for(Engine::Google, "").name(), "Google");
        assert_eq!(translator_for(Engine::Deepl, "k").name(), "DeepL");
        assert_eq!(Engine::default(), Engine::Deepl);
    }
}
