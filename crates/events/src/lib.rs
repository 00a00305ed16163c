//! In-process domain event fan-out for the Canopy platform.

pub mod bus;

pub use bus::{DomainEvent, EventBus};
