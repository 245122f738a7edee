//! API Routes
//!
//! Route handlers organized by functionality.

pub mod dnd;
pub mod health;
pub mod notifications;
pub mod watchers;
