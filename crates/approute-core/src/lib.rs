//! AppRoute Core Types and Traits
//!
//! This crate provides the fundamental types and traits shared across AppRoute:
//! - Rotation event types emitted by the file store
//! - The rotation handler trait implemented by consumers
//! - Core error types

pub mod error;
pub mod handler;
pub mod rotation;

pub use error::{Error, Result};
pub use handler::RotationHandler;
pub use rotation::{FileOp, RotationEvent};
