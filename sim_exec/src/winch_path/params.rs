//! Parameters structure for the winch set

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of a set of winch path generators.
///
/// Positions are in dimensionless step units (for a typical microstepping
/// driver, 800 steps per revolution).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Params {

    /// Number of winch axes in the set.
    pub num_axes: usize,

    /// Maximum allowable axis velocity, applied to all axes.
    ///
    /// Units: steps/second
    pub qd_max_steps_s: f32,

    /// Maximum allowable axis acceleration, applied to all axes.
    ///
    /// Units: steps/second^2
    pub qdd_max_steps_ss: f32,

    /// Natural frequency of the tracking servo, applied to all axes at init.
    ///
    /// Units: hertz
    pub freq_hz: f32,

    /// Damping ratio of the tracking servo, 1.0 at critical damping.
    /// Applied to all axes at init.
    pub damping_ratio: f32
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Params {
            num_axes: 4,
            qd_max_steps_s: 3500.0,
            qdd_max_steps_ss: 35000.0,
            freq_hz: 1.0,
            damping_ratio: 1.0
        }
    }
}
