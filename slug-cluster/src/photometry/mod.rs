//! Photometric bands, constants and spectral quadrature

pub mod band;
pub mod constants;
pub mod quadrature;

pub use band::{default_bands, resolve_bands, BandError, BandIndexRange, EnergyBand, ResolvedBand};
pub use constants::CGS;
pub use quadrature::{IntegrationRule, QuadratureError};
