//! Translator trait — optional post-processing of NPC replies.

use async_trait::async_trait;

use crate::error::TranslationError;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the language identified by a two-letter code.
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslationError>;
}

/// A translator for servers without a translation service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTranslation;

#[async_trait]
impl Translator for NoTranslation {
    async fn translate(
        &self,
        _text: &str,
        target_lang: &str,
    ) -> std::result::Result<String, TranslationError> {
        Err(TranslationError::Unavailable(format!(
            "no translation service configured for '{target_lang}'"
        )))
    }
}

/// Two-letter language code from a client locale like `de_de`, falling back
/// to `default` when the locale is missing or too short.
pub fn language_code(locale: Option<&str>, default: &str) -> String {
    match locale {
        Some(l) if l.chars().count() >= 2 => l.chars().take(2).collect::<String>().to_lowercase(),
        _ => default.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_from_locale() {
        assert_eq!(language_code(Some("de_DE"), "en"), "de");
        assert_eq!(language_code(Some("FR"), "en"), "fr");
        assert_eq!(language_code(Some("x"), "en"), "en");
        assert_eq!(language_code(None, "EN"), "en");
    }

    #[tokio::test]
    async fn no_translation_is_unavailable() {
        let result = NoTranslation.translate("hello", "de").await;
        assert!(matches!(result, Err(TranslationError::Unavailable(_))));
    }
}
