//! Conversions between the store's JSON wire formats and migrator types.

pub mod attribute;
pub mod stream;
