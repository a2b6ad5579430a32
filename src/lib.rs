//! Wii U television bridge library.
//!
//! Exposes a Wii U console running the Ristretto control server as a HomeKit
//! television: installed titles become input sources, and the console's
//! liveness, running title and GamePad battery are polled over HTTP.

pub mod accessory;
pub mod catalog;
pub mod config;
pub mod error;
pub mod instance_lock;
pub mod platform;
pub mod ristretto;
