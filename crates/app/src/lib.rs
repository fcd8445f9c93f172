//! # loxbridge-app
//!
//! Application layer: the mapping engine and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** the transports implement:
//!   - `PublishSink`: fire-and-forget publish onto the bus
//!   - `DeviceCommandSink`: forward a resolved command to the device
//! - Define the **topic policy**: how controls, sub-controls and states fold
//!   into flat topic names, and which wildcard patterns cover commands
//! - Provide the **Adaptor**: routing tables built from a structure, outbound
//!   value publication, inbound command resolution, teardown
//! - Serialize the structure into the retained discovery **catalog**
//! - Provide the **Gateway** driver that swaps adaptors on structure reloads
//!
//! ## Dependency rule
//! Depends on `loxbridge-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod adaptor;
pub mod catalog;
pub mod config;
pub mod gateway;
pub mod ports;
pub mod topic;
