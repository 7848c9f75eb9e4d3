//! The translation capability the scheduler depends on

use async_trait::async_trait;

use crate::core::errors::Result;

/// Translates a batch of texts into one target language.
///
/// Implementations return exactly one output per input, in input order.
/// An empty batch must return an empty result without contacting anything.
#[async_trait]
pub trait TranslationPort: Send + Sync {
    async fn translate(&self, texts: &[String], target_lang: &str) -> Result<Vec<String>>;
}
