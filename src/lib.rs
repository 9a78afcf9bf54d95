// src/lib.rs

use sea_orm::DatabaseConnection;
use services::{notifications::NotificationQueueService, payments::PaymentProcessorService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub notifications: NotificationQueueService,
    pub payments: PaymentProcessorService,
}

pub mod entities {
    pub mod prelude;
    pub mod arrears_cases;
    pub mod attendance_records;
    pub mod dues_transactions;
    pub mod fund_transactions;
    pub mod stipend_disbursements;
    pub mod strike_funds;
}

pub mod services {
    pub mod arrears;
    pub mod attendance;
    pub mod checkin_token;
    pub mod forecasting;
    pub mod geo;
    pub mod notifications;
    pub mod payments;
    pub mod stipends;
}

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
