//! # Winch path generator module
//!
//! Second-order path generators emulating the firmware of stepper-motor
//! driven winches. Each axis runs an independent critically-dampable
//! position servo
//!
//! `qdd = k*(q_d - q) + b*(qd_d - qd)`
//!
//! with hard velocity and acceleration limits, integrated at a fixed
//! sub-step. Positions are in dimensionless step units.
//!
//! Two forms are provided:
//!
//! - [`Path`] — a single scalar axis in `f64`.
//! - [`NPath`] — a vectorised set of axes in `f32`, matching the single
//!   precision arithmetic of the firmware it stands in for, with a
//!   piecewise-linear reference trajectory generator on top of the servo.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod npath;
mod params;
mod path;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use npath::*;
pub use params::*;
pub use path::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fixed integration sub-step of the path generators.
///
/// Units: seconds
pub const SUBSTEP_S: f64 = 0.005;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during WinchSet operation.
#[derive(Debug, thiserror::Error)]
pub enum WinchSetError {
    #[error("The module has not been initialised")]
    NotInitialised,
}
