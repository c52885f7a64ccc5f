//! Domain model module declarations.

pub mod schema;
pub mod status;
