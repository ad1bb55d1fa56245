//! Physical constants in CGS units

/// Constants in CGS units
pub struct CGS {}

impl CGS {
    /// Planck's constant
    /// Units: 6.62607015e-27 erg⋅s (erg-seconds in CGS)
    pub const PLANCK_CONSTANT: f64 = 6.62607015e-27;

    /// Speed of light in vacuum
    /// Units: 2.99792458e10 cm/s (centimeters per second in CGS)
    pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

    /// One angstrom
    /// Units: 1e-8 cm
    pub const ANGSTROM: f64 = 1e-8;

    /// Nominal solar luminosity (IAU 2015 B3)
    /// Units: 3.828e33 erg/s
    pub const SOLAR_LUMINOSITY: f64 = 3.828e33;

    /// One electron-volt
    /// Units: 1.602176634e-12 erg
    pub const ELECTRON_VOLT: f64 = 1.602176634e-12;

    /// Product of Planck's constant and the speed of light
    /// Units: erg⋅cm
    pub const fn hc() -> f64 {
        Self::PLANCK_CONSTANT * Self::SPEED_OF_LIGHT
    }
}

/// Convert a photon energy in electron-volts to its wavelength in angstroms
///
/// λ = hc / E
pub fn ev_to_angstrom(energy_ev: f64) -> f64 {
    CGS::hc() / (energy_ev * CGS::ELECTRON_VOLT) / CGS::ANGSTROM
}

/// Convert a wavelength in angstroms to the photon energy in electron-volts
pub fn angstrom_to_ev(wavelength_angstrom: f64) -> f64 {
    CGS::hc() / (wavelength_angstrom * CGS::ANGSTROM) / CGS::ELECTRON_VOLT
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lyman_edge_energy() {
        // ~911.65 Å is the 13.6 eV hydrogen ionization edge
        assert_relative_eq!(angstrom_to_ev(911.65), 13.6, epsilon = 1e-3);
    }

    #[test]
    fn test_six_ev_wavelength() {
        assert_relative_eq!(ev_to_angstrom(6.0), 2066.40, epsilon = 1e-2);
    }

    #[test]
    fn test_round_trip_conversion() {
        let wl = 1108.0;
        assert_relative_eq!(ev_to_angstrom(angstrom_to_ev(wl)), wl, epsilon = 1e-9);
    }
}
