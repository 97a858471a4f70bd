//! Request and response shapes shared by several handlers.

mod pagination;
mod response;

pub use pagination::{PaginationMeta, PaginationParams};
pub use response::{Created, MessageResponse, NoContent};
