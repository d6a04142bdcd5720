//! Model listing with a fixed fallback.

use pocketline_core::provider::Provider;
use pocketline_core::settings::ApiSettings;
use tracing::warn;

/// Ask the endpoint for its models; on any failure (or an empty answer)
/// return `fallback` instead.
pub async fn list_models_or_fallback(
    provider: &dyn Provider,
    api: &ApiSettings,
    fallback: &[String],
) -> Vec<String> {
    match provider.list_models(api).await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => fallback.to_vec(),
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Model listing failed, using fallback list");
            fallback.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pocketline_core::error::ProviderError;
    use pocketline_core::provider::{CompletionRequest, ProviderResponse};

    struct Listing(Result<Vec<String>, ProviderError>);

    #[async_trait]
    impl Provider for Listing {
        fn name(&self) -> &str {
            "listing"
        }

        async fn complete(&self, _: CompletionRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("listing only".into()))
        }

        async fn list_models(&self, _: &ApiSettings) -> Result<Vec<String>, ProviderError> {
            self.0.clone()
        }
    }

    fn fallback() -> Vec<String> {
        vec!["fallback-a".into(), "fallback-b".into()]
    }

    #[tokio::test]
    async fn endpoint_models_win() {
        let p = Listing(Ok(vec!["live".into()]));
        let models = list_models_or_fallback(&p, &ApiSettings::default(), &fallback()).await;
        assert_eq!(models, ["live"]);
    }

    #[tokio::test]
    async fn failure_returns_fallback_in_order() {
        let p = Listing(Err(ProviderError::Network("offline".into())));
        let models = list_models_or_fallback(&p, &ApiSettings::default(), &fallback()).await;
        assert_eq!(models, fallback());
    }

    #[tokio::test]
    async fn empty_listing_returns_fallback() {
        let p = Listing(Ok(vec![]));
        let models = list_models_or_fallback(&p, &ApiSettings::default(), &fallback()).await;
        assert_eq!(models, fallback());
    }
}
