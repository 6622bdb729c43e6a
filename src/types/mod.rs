//! Type definitions module.
//!
//! Contains shared types used across the application.

pub mod filter;
pub mod logs;
pub mod transaction;
pub mod value;

pub use filter::*;
pub use logs::*;
pub use transaction::*;
