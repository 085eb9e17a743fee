use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::notifications::NotificationSender;
use crate::services::payments::PaymentProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentProvider>,
    pub notifier: Box<dyn NotificationSender>,
}
