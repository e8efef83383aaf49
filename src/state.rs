use std::sync::Arc;

use tracing::warn;

use crate::{
    auth::VerificationService,
    config::Config,
    database::{init_redis, MemoryStore, RecordStore, RedisStore},
    images::{BinaryStore, HttpBinaryStore},
    issues::IssueService,
    mailer::{HttpMailer, Mailer},
};

pub type SharedState = Arc<State>;

/// Everything a request handler needs: configuration plus the collaborators
/// constructed once at startup. The store client is built here and injected
/// into both services; nothing holds module-level handles.
pub struct State {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub verification: VerificationService,
    pub issues: IssueService,
    pub images: Arc<dyn BinaryStore>,
}

impl State {
    pub async fn new() -> SharedState {
        let config = Config::load();

        let store: Arc<dyn RecordStore> = if config.store_backend == "memory" {
            warn!("Using the in-process record store, data will not survive a restart");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(RedisStore::new(init_redis(&config.redis_url).await))
        };

        let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(
            config.mail_endpoint.clone(),
            config.mail_token.clone(),
            config.mail_from.clone(),
        ));

        let images: Arc<dyn BinaryStore> = Arc::new(HttpBinaryStore::new(
            config.image_upload_url.clone(),
            config.image_upload_preset.clone(),
        ));

        Arc::new(Self {
            verification: VerificationService::new(store.clone(), mailer.clone()),
            issues: IssueService::new(store.clone(), mailer),
            store,
            images,
            config,
        })
    }
}
