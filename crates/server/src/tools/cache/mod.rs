//! Read-only cache inspection tools.

pub mod generations;
pub mod lookup;

pub use generations::generations_impl;
pub use lookup::{CacheMatchParams, match_impl};
