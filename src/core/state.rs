use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::expiry::ExpiryPolicy;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    expiry: ExpiryPolicy,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool) -> Self {
        let expiry = ExpiryPolicy::from_settings(&settings);
        Self { inner: Arc::new(InnerState { settings, db, expiry }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn expiry(&self) -> &ExpiryPolicy {
        &self.inner.expiry
    }
}
