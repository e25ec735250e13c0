//! Vitrina Core - Shared domain types.
//!
//! This crate provides the value types used across all Vitrina components:
//! - `admin` - Storefront catalog service, admin gate and HTTP surface
//! - `cli` - Command-line tools for inspecting and seeding a store
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no backend
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phone numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
