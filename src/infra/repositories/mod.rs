//! Repository layer - Data access abstraction
//!
//! Each repository is a trait with a sea-orm backed `*Store`. The query
//! helpers are generic over the connection so the transactional
//! repositories in [`crate::infra::unit_of_work`] reuse them.

mod asset_repository;
pub(crate) mod entities;
mod portfolio_repository;
mod signal_repository;
mod user_repository;

pub use asset_repository::{AssetRepository, AssetStore, NewAsset};
pub use portfolio_repository::{PortfolioRepository, PortfolioStore};
pub use signal_repository::{SignalRepository, SignalStore};
pub use user_repository::{UserRepository, UserStore};

pub(crate) use asset_repository::{find_asset, upsert_asset};
pub(crate) use portfolio_repository::{
    count_positions, find_position_by_asset, insert_position, set_position,
};
pub(crate) use signal_repository::insert_signal;

#[cfg(any(test, feature = "test-utils"))]
pub use asset_repository::MockAssetRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use portfolio_repository::MockPortfolioRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use signal_repository::MockSignalRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
