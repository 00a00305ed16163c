//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//!
//! Serialized field names are camelCase to match the wire contract.

pub mod audit;
pub mod dashboard;
pub mod forest;
pub mod measurement;
pub mod session;
pub mod tree;
pub mod tree_image;
pub mod user;
