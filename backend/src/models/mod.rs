//! Domain models for the Warehouse Inventory Management System
//!
//! Re-exports models from the shared crate; persistence-facing row types
//! live next to the services that own them.

pub use shared::models::*;
