//! Shared application state.
//!
//! Every service is constructed once in `main` and injected here; nothing
//! reaches for process-wide globals.

use std::sync::Arc;

use crate::auth::TokenSigner;
use crate::blobstore::BlobStore;
use crate::broker::SessionBroker;
use crate::devices::DeviceDirectory;
use crate::storage::FleetDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: FleetDatabase,
    pub directory: DeviceDirectory,
    pub blobs: Arc<BlobStore>,
    pub broker: Arc<SessionBroker>,
    pub signer: Arc<TokenSigner>,
}
