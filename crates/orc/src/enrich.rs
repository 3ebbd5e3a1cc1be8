use async_trait::async_trait;
use std::collections::HashMap;

/// Opaque hook for pre-annotating a prompt before template substitution.
///
/// The crate ships only [`IdentityEnricher`]; retrieval-augmented or other
/// enrichment strategies are external collaborators implementing this trait.
#[async_trait]
pub trait PromptEnricher: Send + Sync {
    async fn enrich(&self, text: &str, kwargs: &HashMap<String, String>) -> String;
}

/// The default [`PromptEnricher`]: returns the input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEnricher;

#[async_trait]
impl PromptEnricher for IdentityEnricher {
    async fn enrich(&self, text: &str, _kwargs: &HashMap<String, String>) -> String {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identity_enricher_returns_input_unchanged() {
        let enricher = IdentityEnricher;
        let out = enricher.enrich("hello", &HashMap::new()).await;
        assert_eq!(out, "hello");
    }
}
