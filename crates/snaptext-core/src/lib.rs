pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::SnaptextConfig;
pub use error::{Result, SnaptextError};
pub use events::{DiscardReason, DomainEvent};
pub use types::*;
