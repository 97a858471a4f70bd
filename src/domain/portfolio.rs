//! Portfolio and position entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::asset::AssetType;

/// Named collection of positions owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Holding of one asset inside a portfolio, joined with its asset row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub asset_id: Uuid,
    pub symbol: String,
    pub asset_name: String,
    pub asset_type: AssetType,
    pub quantity: f64,
    pub avg_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_cost
    }
}

/// Quantity and average cost after buying `added_quantity` more at `price`.
///
/// The new average is weighted by quantity.
pub fn merge_lot(quantity: f64, avg_cost: f64, added_quantity: f64, price: f64) -> (f64, f64) {
    let total_quantity = quantity + added_quantity;
    if total_quantity <= 0.0 {
        return (0.0, 0.0);
    }
    let total_cost = quantity * avg_cost + added_quantity * price;
    (total_quantity, total_cost / total_quantity)
}
