//! Request extractors that report failures as [`crate::errors::AppError`].

mod params;
mod validated_json;

pub use params::{ParsedForm, ParsedPath, ParsedQuery};
pub use validated_json::ValidatedJson;
