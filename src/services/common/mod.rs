//! Common utilities shared by services

/// Reactive property system for fine-grained state updates
pub mod property;

pub use property::Property;
