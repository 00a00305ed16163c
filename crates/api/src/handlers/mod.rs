//! HTTP request handlers, one module per resource.

pub mod audit;
pub mod auth;
pub mod bulk;
pub mod dashboard;
pub mod exports;
pub mod forests;
pub mod measurements;
pub mod trees;
pub mod uploads;
pub mod users;
