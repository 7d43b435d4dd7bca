//! Test utilities for creating mock LSP clients and configs.

#[cfg(test)]
pub(crate) mod test_helpers {
    use crate::config::DdexConfig;
    use crate::server::Backend;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower_lsp_server::Client;

    /// Creates a test client and config for handler tests.
    ///
    /// The client is never initialized, so anything it is asked to publish
    /// is dropped. Handler tests assert on `ServerState` instead.
    pub fn create_test_client_and_config() -> (Client, Arc<RwLock<DdexConfig>>) {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let client = service.inner().client.clone();
        let config = Arc::new(RwLock::new(DdexConfig::default()));
        (client, config)
    }
}
