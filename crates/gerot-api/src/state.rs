use std::sync::Arc;

use gerot_db::Database;

use crate::config::Settings;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<Database>,
    pub settings: Arc<Settings>,
}

impl ApiState {
    pub fn new(db: Database, settings: Settings) -> Self {
        Self {
            db: Arc::new(db),
            settings: Arc::new(settings),
        }
    }
}
