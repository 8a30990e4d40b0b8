//! Fitroom Core - Shared types library.
//!
//! This crate provides common types used across all Fitroom components:
//! - `relay` - Image relay service for AI virtual try-on
//! - `storefront` - Client for the hosted catalog/cart data store and the try-on flow
//! - `cli` - Command-line tools for operators
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, catalog/cart/order records, try-on wire
//!   types, local image validation, try-on history records and the
//!   rule-based stylist

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
