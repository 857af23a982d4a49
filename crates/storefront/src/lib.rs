//! Boutique storefront library.
//!
//! Client-side state for a small shop backed by a headless content API:
//! a persisted shopping cart and a filterable product catalog.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod content;
pub mod error;
pub mod state;
pub mod storage;

pub use state::Storefront;
