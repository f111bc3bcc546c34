//! Electromagnetics calculations.
pub mod ring;
pub mod wire;

pub use ring::{flux_density_ring, flux_density_ring_par};
pub use wire::{flux_density_wire, flux_density_wire_par};
