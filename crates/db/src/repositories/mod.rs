//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that must run
//! inside a caller-owned transaction accept `&mut PgConnection` instead;
//! pass `&mut *tx` from a `Transaction`.

pub mod audit_repo;
pub mod dashboard_repo;
pub mod forest_repo;
pub mod measurement_repo;
pub mod session_repo;
pub mod tree_image_repo;
pub mod tree_repo;
pub mod user_repo;

pub use audit_repo::AuditLogRepo;
pub use dashboard_repo::DashboardRepo;
pub use forest_repo::ForestRepo;
pub use measurement_repo::MeasurementRepo;
pub use session_repo::SessionRepo;
pub use tree_image_repo::TreeImageRepo;
pub use tree_repo::TreeRepo;
pub use user_repo::UserRepo;
