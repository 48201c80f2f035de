//! Architecture Verification Suite
//!
//! Every component is shared between tasks, so all of them must be thread-safe.

#[cfg(test)]
mod architecture_tests {
    use callgate::chain::{ChainedCatalog, ChainedGate, ChainedRegistry, LoopbackResolver, Peer, PeerResolver, TierEndpoint};
    use callgate::navigation::SectionListener;

    fn assert_send_sync<T: Send + Sync + ?Sized>() {}

    #[test]
    fn test_local_components_are_thread_safe() {
        assert_send_sync::<callgate::CallRegistry>();
        assert_send_sync::<callgate::DynCatalog>();
        assert_send_sync::<callgate::NavigationStack>();
        assert_send_sync::<callgate::NavigationService>();
        assert_send_sync::<callgate::NavigationGate>();
        assert_send_sync::<callgate::Tier>();
    }

    #[test]
    fn test_chain_components_are_thread_safe() {
        assert_send_sync::<ChainedRegistry>();
        assert_send_sync::<ChainedCatalog>();
        assert_send_sync::<ChainedGate>();
        assert_send_sync::<LoopbackResolver>();
        assert_send_sync::<TierEndpoint>();
    }

    #[test]
    fn test_values_are_thread_safe() {
        assert_send_sync::<callgate::CallHandler>();
        assert_send_sync::<callgate::CallContext>();
        assert_send_sync::<callgate::CallError>();
        assert_send_sync::<callgate::RegistryHandle>();
        assert_send_sync::<callgate::CatalogHandle>();
        assert_send_sync::<callgate::GateHandle>();
    }

    // Seams are object safe and shareable
    #[test]
    fn test_seams_are_object_safe() {
        assert_send_sync::<dyn Peer>();
        assert_send_sync::<dyn PeerResolver>();
        assert_send_sync::<dyn SectionListener>();
    }
}
