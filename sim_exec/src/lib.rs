//! Library for the pendulum/winch simulation executable.
//!
//! The two numerical cores live here:
//!
//! - [`dbl_pend`] — rigid-body dynamic simulation of a frictionless planar
//!   double pendulum driven by a pluggable torque controller, with closed
//!   form forward and inverse kinematics.
//! - [`winch_path`] — second-order path generators emulating the firmware of
//!   stepper-motor-driven winches, in scalar and vectorised forms.
//!
//! Both cores are pure, step-driven numerical state machines with no I/O.
//! The [`scenario`] module assembles them into the demonstration scenes run
//! by the `sim_exec` binary.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod dbl_pend;
pub mod scenario;
pub mod winch_path;
