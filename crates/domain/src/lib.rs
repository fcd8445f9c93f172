//! # loxbridge-domain
//!
//! Pure domain model for the loxbridge gateway.
//!
//! ## Responsibilities
//! - Define the **Structure**: the device's graph of controls, sub-controls,
//!   named states, rooms, categories and global states
//! - Parse the device's structure document tolerantly, reporting malformed
//!   fields through a caller-supplied callback instead of failing
//! - Hold the current value of every state identifier and notify
//!   subscribers when one changes
//! - Provide the name normalization used for bus-facing field names
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates;
//! `tokio::sync` is used for the change channel only.

pub mod error;
pub mod naming;
pub mod structure;
pub mod value;
