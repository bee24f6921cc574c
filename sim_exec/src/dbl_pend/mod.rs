//! # Double pendulum simulation module
//!
//! Numerical dynamic simulation of a frictionless two-link planar pendulum.
//! The equations of motion are the standard two-link manipulator mass
//! matrix / Coriolis / gravity decomposition derived from the Lagrangian,
//! solved for the joint accelerations by Cramer's rule and integrated with a
//! fixed-step forward Euler scheme.
//!
//! Joint torques are supplied once per inner integration step by an attached
//! [`PendulumController`], which is the customisation point for the different
//! control strategies (fixed-setpoint PD, swing-up pumping, keyframed poses,
//! endpoint tracking via inverse kinematics).
//!
//! The simulator owns its state exclusively and performs no I/O; it is
//! advanced synchronously by an external caller through
//! [`DoublePendulumSim::timer_tick`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod kinematics;
mod params;
mod sim;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use kinematics::*;
pub use params::*;
pub use sim::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fixed inner integration step of the simulator.
///
/// Units: seconds
///
/// The forward Euler scheme at this step size is part of the model's defined
/// behaviour (it drifts energy slightly); do not swap it for a higher-order
/// integrator without revalidating everything built on top of it.
pub const INNER_STEP_S: f64 = 0.001;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during PendSim operation.
#[derive(Debug, thiserror::Error)]
pub enum PendSimError {
    #[error("The module has not been initialised")]
    NotInitialised,
}
