//! Ristretto: the HTTP control server running on the console.
//!
//! [`RistrettoClient`] speaks the raw HTTP surface; [`ConsoleFacade`] layers
//! availability tracking and safe defaults on top of it.

pub mod availability;
pub mod client;
pub mod facade;

pub use availability::{Availability, Reachability};
pub use client::RistrettoClient;
pub use facade::{ConsoleFacade, CurrentTitle, SystemInfo};
