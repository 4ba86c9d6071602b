use std::sync::Arc;

use super::config::RelayConfig;

/// Shared state for the relay handler.
#[derive(Clone)]
pub(super) struct RelayState {
    pub(super) config: Arc<RelayConfig>,
}
