//! Implementations for the PendSim module state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{
    DoublePendulumSim, Params, PendSimError, PendulumController,
    INNER_STEP_S};
use util::{
    params,
    maths::wrap_pi,
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Double pendulum simulation module state.
///
/// Wraps a [`DoublePendulumSim`] as a cyclic module: parameters are loaded
/// from a file at init, the simulator is ticked once per cycle, and the
/// resulting state is archived to the session.
#[derive(Default)]
pub struct PendSim {
    sim: Option<DoublePendulumSim>,

    pub(crate) report: StatusReport,

    pub(crate) output: Option<OutputData>,
    arch_output: Archiver
}

/// Data required to initialise a PendSim module.
pub struct InitData {
    /// Path to the parameter file, relative to the params directory.
    pub params_path: &'static str,

    /// World position of the rig's base.
    ///
    /// Units: meters
    pub origin_m: Vector2<f64>,

    /// The controller to attach to the simulator.
    pub controller: Box<dyn PendulumController>,

    /// Archive file name for this rig, relative to the session archive root.
    pub arch_name: String
}

/// Input data to PendSim.
#[derive(Clone, Copy)]
pub struct InputData {
    /// The simulated interval to advance by this cycle.
    ///
    /// Units: seconds
    pub frame_interval_s: f64
}

/// Snapshot of the simulation at the end of a cycle.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct OutputData {
    /// Simulated time since reset.
    ///
    /// Units: seconds
    pub t_s: f64,

    /// Shoulder angle.
    ///
    /// Units: radians
    pub q1_rad: f64,

    /// Elbow angle.
    ///
    /// Units: radians
    pub q2_rad: f64,

    /// Shoulder angle wrapped into `[-pi, pi]`.
    ///
    /// Units: radians
    pub q1_wrapped_rad: f64,

    /// Elbow angle wrapped into `[-pi, pi]`.
    ///
    /// Units: radians
    pub q2_wrapped_rad: f64,

    /// Shoulder velocity.
    ///
    /// Units: radians/second
    pub qd1_rads: f64,

    /// Elbow velocity.
    ///
    /// Units: radians/second
    pub qd2_rads: f64,

    /// Endpoint world position, X component.
    ///
    /// Units: meters
    pub end_x_m: f64,

    /// Endpoint world position, Y component.
    ///
    /// Units: meters
    pub end_y_m: f64,

    /// Total mechanical energy.
    ///
    /// Units: joules
    pub energy_j: f64
}

/// Status report for PendSim processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Number of inner integration steps executed this cycle.
    pub inner_steps: u64,

    /// Total mechanical energy at the end of the cycle.
    ///
    /// Units: joules
    pub energy_j: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PendSim {
    type InitData = InitData;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = PendSimError;

    /// Initialise the PendSim module.
    ///
    /// Loads the dynamics parameters, builds the simulator around the given
    /// controller, and opens the archive for this rig.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let params: Params = params::load(init_data.params_path)?;

        self.sim = Some(DoublePendulumSim::new(
            &params,
            init_data.origin_m,
            init_data.controller));

        // Initialise the archiver
        self.arch_output = Archiver::from_path(
            session, init_data.arch_name
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the pendulum simulation.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let sim = match self.sim {
            Some(ref mut s) => s,
            None => return Err(PendSimError::NotInitialised)
        };

        // Advance the simulation by one frame. The interval truncates to
        // whole inner steps, see `DoublePendulumSim::timer_tick`.
        let inner_steps =
            (input_data.frame_interval_s / INNER_STEP_S).floor() as u64;
        sim.timer_tick(input_data.frame_interval_s);

        let state = *sim.state();
        let end = sim.endpoint();
        let energy_j = sim.total_energy();

        let output = OutputData {
            t_s: sim.time_s(),
            q1_rad: state[0],
            q2_rad: state[1],
            q1_wrapped_rad: wrap_pi(state[0]),
            q2_wrapped_rad: wrap_pi(state[1]),
            qd1_rads: state[2],
            qd2_rads: state[3],
            end_x_m: end[0],
            end_y_m: end[1],
            energy_j
        };

        trace!(
            "PendSim t = {:.3}: q = [{:.3}, {:.3}], E = {:.3} J",
            output.t_s, output.q1_rad, output.q2_rad, output.energy_j);

        self.report = StatusReport {
            inner_steps,
            energy_j
        };
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for PendSim {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl PendSim {
    /// The output of the most recent cycle, `None` before the first.
    pub fn last_output(&self) -> Option<OutputData> {
        self.output
    }

    /// Current endpoint world position, `None` before init.
    pub fn endpoint(&self) -> Option<Vector2<f64>> {
        self.sim.as_ref().map(|sim| sim.endpoint())
    }

    /// Reset the underlying simulation to the controller's initial state.
    pub fn reset(&mut self) {
        if let Some(ref mut sim) = self.sim {
            sim.reset();
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
    fn test_proc_before_init_fails() {
        let mut pend_sim = PendSim::default();

        let result = pend_sim.proc(&InputData { frame_interval_s: 0.02 });

        assert!(matches!(result, Err(PendSimError::NotInitialised)));
    }
}
