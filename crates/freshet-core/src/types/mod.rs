//! Type system for Freshet
//!
//! This module contains the runtime type system:
//! - Value types carried in event bodies and configuration mappings

pub mod value;

pub use value::Value;
