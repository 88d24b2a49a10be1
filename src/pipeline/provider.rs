use super::input::{PropertyMap, ResolvedOutputs};
use super::resource::{ResourceArgs, ResourceId};
use async_trait::async_trait;

/// Error type returned by providers and post-apply steps
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Creates concrete resources from fully-resolved arguments
///
/// Implementations return the output properties other resources may
/// reference; every resource should at least report `name`.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn create(
        &self,
        id: &ResourceId,
        args: &ResourceArgs<String>,
    ) -> Result<PropertyMap, ProviderError>;

    fn name(&self) -> &str;
}

/// Imperative task run once the resource graph has been applied
#[async_trait]
pub trait PostStep: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, outputs: &ResolvedOutputs) -> Result<(), ProviderError>;
}
