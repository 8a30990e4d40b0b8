//! Fitroom storefront client library.
//!
//! - [`datastore`]: catalog, cart, wishlist, orders, reviews, try-on history
//!   and photo uploads against the hosted data store's REST API, with cached
//!   catalog reads.
//! - [`tryon`]: the virtual try-on flow (photo validation, garment selection,
//!   a single in-flight submission, progress and result state) and the client
//!   for the try-on relay.
//! - [`stylist`]: rule-based style suggestions for a skin tone and occasion.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod datastore;
pub mod stylist;
pub mod tryon;
