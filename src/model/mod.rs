//! Data model shared by all solution strategies.

/// EV-adoption sampling for a community of homes.
pub mod community;
/// Residence description: baseline load and EV charging parameters.
pub mod home;
/// Radial feeder topology and linearized voltage estimation.
pub mod network;
pub mod tariff;

pub use home::{EvSpec, Home};
pub use network::{Edge, Network, NetworkError};
pub use tariff::Tariff;
