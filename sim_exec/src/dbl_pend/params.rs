//! Parameters structure for the double pendulum dynamics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rigid-body parameters of the double pendulum.
///
/// Masses and lengths shall be strictly positive; degenerate values make the
/// mass matrix singular and are not guarded against.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Length of the proximal link (shoulder to elbow).
    ///
    /// Units: meters
    pub l1_m: f64,

    /// Length of the distal link (elbow to endpoint).
    ///
    /// Units: meters
    pub l2_m: f64,

    /// Distance from the proximal joint to the centre of mass of link 1.
    ///
    /// Units: meters
    pub lc1_m: f64,

    /// Distance from the distal joint to the centre of mass of link 2.
    ///
    /// Units: meters
    pub lc2_m: f64,

    // ---- INERTIAL ----

    /// Mass of link 1.
    ///
    /// Units: kilograms
    pub m1_kg: f64,

    /// Mass of link 2.
    ///
    /// Units: kilograms
    pub m2_kg: f64,

    /// Gravitational acceleration. Negative values pull the pendulum
    /// towards the -Y axis (hanging down).
    ///
    /// Units: meters/second^2
    pub gravity_mss: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Params {
            l1_m: 1.0,
            l2_m: 1.0,
            lc1_m: 0.5,
            lc2_m: 0.5,
            m1_kg: 1.0,
            m2_kg: 1.0,
            gravity_mss: -9.81
        }
    }
}

impl Params {
    /// Moment of inertia of link 1 about its centre of mass, modelled as a
    /// uniform rod.
    ///
    /// Units: kilogram meters^2
    pub fn i1(&self) -> f64 {
        self.m1_kg * self.l1_m * self.l1_m / 12.0
    }

    /// Moment of inertia of link 2 about its centre of mass, modelled as a
    /// uniform rod.
    ///
    /// Units: kilogram meters^2
    pub fn i2(&self) -> f64 {
        self.m2_kg * self.l2_m * self.l2_m / 12.0
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_inertias() {
        let params = Params::default();

        // Uniform rod of unit mass and length
        assert!((params.i1() - 1.0 / 12.0).abs() < 1e-15);
        assert!((params.i2() - 1.0 / 12.0).abs() < 1e-15);
    }
}
