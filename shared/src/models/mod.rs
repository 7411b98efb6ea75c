//! Domain models for the Warehouse Inventory Management System

mod document;
mod serial;
mod status;
mod stock;
mod user;

pub use document::*;
pub use serial::*;
pub use status::*;
pub use stock::*;
pub use user::*;
