use crate::host::HostError;

/// Fatal failures while registering the provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to initialize the font service: {0}")]
    Factory(#[source] HostError),
    #[error("failed to register the collection loader: {0}")]
    RegisterLoader(#[source] HostError),
    #[error("failed to build the private font collection: {0}")]
    CustomCollection(#[source] HostError),
    #[error("failed to open the system font collection: {0}")]
    SystemCollection(#[source] HostError),
}
