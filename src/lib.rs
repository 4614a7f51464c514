pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod events;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::events::EventHub;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub hub: EventHub,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            hub: EventHub::new(),
        }
    }
}
