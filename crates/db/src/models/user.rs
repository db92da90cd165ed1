//! User entity model.
//!
//! Account management (registration, login, password handling) lives in an
//! external service; this crate only reads the columns the generation
//! pipeline cares about: tier, premium expiry, contact address, and the
//! best-effort daily counter.

use serde::Serialize;
use sqlx::FromRow;

use ladle_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub tier: String,
    pub premium_until: Option<Timestamp>,
    pub daily_generation_counter: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
