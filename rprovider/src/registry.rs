//! Adapter registry for runtime adapter lookup by provider id.
//!
//! ```rust
//! use rprovider::AdapterRegistry;
//!
//! let registry = AdapterRegistry::new();
//! assert!(registry.is_empty());
//! assert_eq!(registry.len(), 0);
//! ```

use std::sync::Arc;

use rcommon::Registry;

use crate::{ProviderError, ProviderId, VendorAdapter};

#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: Registry<ProviderId, Arc<dyn VendorAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A>(&mut self, adapter: A)
    where
        A: VendorAdapter + 'static,
    {
        self.adapters.insert(adapter.id(), Arc::new(adapter));
    }

    pub fn register_shared(&mut self, adapter: Arc<dyn VendorAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, provider_id: ProviderId) -> Option<Arc<dyn VendorAdapter>> {
        self.adapters.get(&provider_id).cloned()
    }

    pub fn resolve(&self, provider_id: ProviderId) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
        self.get(provider_id).ok_or_else(|| {
            ProviderError::configuration(format!("no adapter registered for provider '{provider_id}'"))
        })
    }

    pub fn remove(&mut self, provider_id: ProviderId) -> Option<Arc<dyn VendorAdapter>> {
        self.adapters.remove(&provider_id)
    }

    pub fn contains(&self, provider_id: ProviderId) -> bool {
        self.adapters.contains_key(&provider_id)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids = self.adapters.keys().map(|id| id.as_str()).collect::<Vec<_>>();
        ids.sort_unstable();
        f.debug_struct("AdapterRegistry").field("adapters", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{BoxedSegmentStream, ChatRequest, ProviderErrorKind, ProviderFuture, VecSegmentStream};

    struct StaticAdapter(ProviderId);

    impl VendorAdapter for StaticAdapter {
        fn id(&self) -> ProviderId {
            self.0
        }

        fn open_stream<'a>(
            &'a self,
            _request: ChatRequest,
            _cancel: CancellationToken,
        ) -> ProviderFuture<'a, Result<BoxedSegmentStream<'a>, ProviderError>> {
            Box::pin(async { Ok(Box::pin(VecSegmentStream::new(Vec::new())) as BoxedSegmentStream<'a>) })
        }
    }

    #[test]
    fn registry_registers_and_resolves_by_id() {
        let mut registry = AdapterRegistry::new();
        registry.register(StaticAdapter(ProviderId::DeepSeek));

        assert!(registry.contains(ProviderId::DeepSeek));
        assert!(registry.resolve(ProviderId::DeepSeek).is_ok());

        let missing = registry
            .resolve(ProviderId::QianFan)
            .err()
            .expect("unregistered provider should fail");
        assert_eq!(missing.kind, ProviderErrorKind::Configuration);

        assert!(registry.remove(ProviderId::DeepSeek).is_some());
        assert!(registry.is_empty());
    }
}
