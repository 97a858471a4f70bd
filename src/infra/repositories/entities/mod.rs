//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod asset;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod user;
