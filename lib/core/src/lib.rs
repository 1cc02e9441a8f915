//! Core domain types for the amber-gateway authentication gateway.
//!
//! This crate provides the strongly-typed identifiers shared by the
//! identity domain crate and the server binary.

pub mod id;

pub use id::{ParseIdError, UserId};
