//! Core data types shared across the migrator.
//!
//! Attribute values, images, change records and the write requests produced from them.

mod image;
mod record;
mod sized;
mod value;
mod write;

pub use image::*;
pub use record::*;
pub use sized::*;
pub use value::*;
pub use write::*;
