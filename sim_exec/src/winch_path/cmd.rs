//! # Winch set commands
//!
//! Mirrors the command set of the serial interface to the physical winches,
//! so recorded command streams can be replayed against the simulated set.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::NPath;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command that can be executed by a winch path generator set.
///
/// Axis indices must be below the number of axes in the set, this is a
/// caller precondition.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub enum WinchCmd {
    /// Set the absolute target position of one axis.
    SetTarget {
        axis: usize,

        /// The target position in dimensionless step units.
        position_steps: f32
    },

    /// Add a signed offset to the target position of one axis.
    IncrementTarget {
        axis: usize,

        /// The offset in dimensionless step units.
        offset_steps: f32
    },

    /// Add a signed offset to the reference position of one axis, applying
    /// a triangular impulse.
    IncrementReference {
        axis: usize,

        /// The offset in dimensionless step units.
        offset_steps: f32
    },

    /// Set the target ramp speed of one axis. Zero or negative speeds mean
    /// unlimited, stepping the reference instead of ramping it.
    SetSpeed {
        axis: usize,

        /// The ramp speed in steps/second.
        speed_steps_s: f32
    },

    /// Set the second-order servo gains of one axis from natural frequency
    /// and damping ratio.
    SetFreqDamping {
        axis: usize,

        /// The natural frequency in hertz.
        freq_hz: f32,

        /// The damping ratio, 1.0 at critical damping.
        damping_ratio: f32
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NPath {
    /// Execute one command against the set.
    pub fn apply_cmd(&mut self, cmd: &WinchCmd) {
        match *cmd {
            WinchCmd::SetTarget { axis, position_steps } => {
                self.set_target(axis, position_steps)
            }
            WinchCmd::IncrementTarget { axis, offset_steps } => {
                self.increment_target(axis, offset_steps)
            }
            WinchCmd::IncrementReference { axis, offset_steps } => {
                self.increment_reference(axis, offset_steps)
            }
            WinchCmd::SetSpeed { axis, speed_steps_s } => {
                self.set_speed(axis, speed_steps_s)
            }
            WinchCmd::SetFreqDamping { axis, freq_hz, damping_ratio } => {
                self.set_freq_damping(axis, freq_hz, damping_ratio)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cmd_dispatch() {
        let mut npath = NPath::new(2);

        npath.apply_cmd(&WinchCmd::SetTarget {
            axis: 0, position_steps: 800.0
        });
        npath.apply_cmd(&WinchCmd::IncrementTarget {
            axis: 0, offset_steps: -100.0
        });
        npath.apply_cmd(&WinchCmd::IncrementReference {
            axis: 1, offset_steps: 25.0
        });
        npath.apply_cmd(&WinchCmd::SetSpeed {
            axis: 1, speed_steps_s: 400.0
        });

        assert_eq!(npath.targets()[0], 700.0);
        assert_eq!(npath.references()[1], 25.0);
        assert_eq!(npath.targets()[1], 0.0);
    }
}
