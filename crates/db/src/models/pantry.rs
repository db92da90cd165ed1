//! Pantry item models.
//!
//! Pantry CRUD is handled elsewhere; the pipeline side only reads the rows
//! the expiring-items sweep needs.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use ladle_core::types::{DbId, Timestamp};

/// A row from the `user_pantries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PantryItem {
    pub id: DbId,
    pub user_id: DbId,
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A pantry item nearing expiry, joined with its owner's contact address.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpiringPantryItem {
    pub id: DbId,
    pub user_id: DbId,
    pub ingredient_name: String,
    pub expiry_date: NaiveDate,
    pub email: String,
}
