//! HTTP middleware components.

pub mod client_ip;

pub use client_ip::{ClientIp, client_address, resolve_client_ip};
