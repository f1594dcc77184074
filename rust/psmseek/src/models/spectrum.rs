use serde::Serialize;

pub const MASS_PROTON: f64 = 1.007_276_466_88;

/// An observed MS/MS spectrum, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    pub first_scan: u32,
    pub last_scan: u32,
    pub precursor_mz: f64,
    pub charges: Vec<u8>,
    /// (m/z, intensity) pairs.
    pub peaks: Vec<(f64, f64)>,
}

impl Spectrum {
    pub fn new(first_scan: u32, precursor_mz: f64) -> Self {
        Self {
            first_scan,
            last_scan: first_scan,
            precursor_mz,
            charges: Vec::new(),
            peaks: Vec::new(),
        }
    }

    pub fn with_charges(mut self, charges: Vec<u8>) -> Self {
        self.charges = charges;
        self
    }

    pub fn with_peaks(mut self, peaks: Vec<(f64, f64)>) -> Self {
        self.peaks = peaks;
        self
    }
}

/// An assumed charge together with the neutral mass it implies.
///
/// A charge of 0 means "not set yet".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ZState {
    charge: u8,
    neutral_mass: f64,
}

impl ZState {
    pub fn new(charge: u8, neutral_mass: f64) -> Self {
        Self {
            charge,
            neutral_mass,
        }
    }

    pub fn from_mz(charge: u8, mz: f64) -> Self {
        Self {
            charge,
            neutral_mass: (mz - MASS_PROTON) * charge as f64,
        }
    }

    pub fn charge(&self) -> u8 {
        self.charge
    }

    pub fn neutral_mass(&self) -> f64 {
        self.neutral_mass
    }

    pub fn singly_charged_mass(&self) -> f64 {
        self.neutral_mass + MASS_PROTON
    }

    pub fn mz(&self) -> f64 {
        if self.charge == 0 {
            return f64::NAN;
        }
        self.neutral_mass / self.charge as f64 + MASS_PROTON
    }

    pub fn is_set(&self) -> bool {
        self.charge != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mz_round_trip() {
        let z = ZState::from_mz(2, 500.5);
        assert!((z.mz() - 500.5).abs() < 1e-9);
        assert!((z.singly_charged_mass() - (z.neutral_mass() + MASS_PROTON)).abs() < 1e-12);
    }

    #[test]
    fn test_default_is_unset() {
        assert!(!ZState::default().is_set());
        assert!(ZState::default().mz().is_nan());
    }
}
