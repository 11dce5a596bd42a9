use crate::blob::BlobStore;
use crate::config::Config;
use crate::directory::UserDirectory;
use crate::store::Stores;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserDirectory>,
    pub stores: Arc<Stores>,
    pub blobs: Arc<dyn BlobStore>,
}
