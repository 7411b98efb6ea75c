//! Shared domain logic for the Warehouse Inventory Management System
//!
//! This crate holds the pure, I/O-free parts of the system: document
//! status state machines, the serial-unit lifecycle, monetary totals
//! recomputation, and input validation. The backend builds its services
//! on top of these types.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
