//! Implementations for the WinchSet module state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{NPath, Params, WinchCmd, WinchSetError, SUBSTEP_S};
use util::{
    params,
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Winch path generator set module state.
///
/// Wraps an [`NPath`] as a cyclic module: parameters are loaded from a file
/// at init, pending commands are applied and the set is advanced once per
/// cycle, and per-axis records are archived to the session.
#[derive(Default)]
pub struct WinchSet {
    npath: Option<NPath>,

    pub(crate) report: StatusReport,

    pub(crate) output: Option<OutputData>,
    arch_axes: Archiver
}

/// Input data to WinchSet.
#[derive(Clone, Default)]
pub struct InputData {
    /// The simulated interval to advance by this cycle.
    ///
    /// Units: seconds
    pub interval_s: f64,

    /// Commands to apply before advancing, in order.
    pub cmds: Vec<WinchCmd>
}

/// Snapshot of one winch axis at the end of a cycle.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct AxisRecord {
    /// Elapsed model time.
    ///
    /// Units: seconds
    pub t_s: f64,

    /// Axis index.
    pub axis: usize,

    /// Current position.
    ///
    /// Units: steps
    pub q_steps: f32,

    /// Current velocity.
    ///
    /// Units: steps/second
    pub qd_steps_s: f32,

    /// Current reference position.
    ///
    /// Units: steps
    pub q_d_steps: f32,

    /// Current user target position.
    ///
    /// Units: steps
    pub q_d_d_steps: f32
}

/// Snapshot of the whole set at the end of a cycle.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OutputData {
    pub axes: Vec<AxisRecord>
}

/// Status report for WinchSet processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Number of integration sub-steps executed this cycle.
    pub substeps: u64,

    /// Number of commands applied this cycle.
    pub cmds_applied: usize,

    /// Velocity clamp events across all axes this cycle.
    pub qd_clamp_events: u64,

    /// Acceleration clamp events across all axes this cycle.
    pub qdd_clamp_events: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for WinchSet {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = WinchSetError;

    /// Initialise the WinchSet module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let params: Params = params::load(init_data)?;

        let mut npath = NPath::new(params.num_axes);
        npath.qd_max = params.qd_max_steps_s;
        npath.qdd_max = params.qdd_max_steps_ss;

        for axis in 0..params.num_axes {
            npath.set_freq_damping(
                axis, params.freq_hz, params.damping_ratio);
        }

        self.npath = Some(npath);

        // Initialise the archiver
        self.arch_axes = Archiver::from_path(
            session, "winch_set.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the winch set.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let npath = match self.npath {
            Some(ref mut n) => n,
            None => return Err(WinchSetError::NotInitialised)
        };

        // Apply any pending commands in order
        for cmd in &input_data.cmds {
            trace!("WinchSet applying {:?}", cmd);
            npath.apply_cmd(cmd);
        }

        let qd_clamps_before: u64 = npath.qd_clamp_events().iter().sum();
        let qdd_clamps_before: u64 = npath.qdd_clamp_events().iter().sum();

        // Advance the set by one frame. The interval truncates to whole
        // sub-steps, see `NPath::update_for_interval`.
        let substeps = (input_data.interval_s / SUBSTEP_S).floor() as u64;
        npath.update_for_interval(input_data.interval_s);

        let axes = (0..npath.num_axes())
            .map(|axis| AxisRecord {
                t_s: npath.t_s,
                axis,
                q_steps: npath.positions()[axis],
                qd_steps_s: npath.velocities()[axis],
                q_d_steps: npath.references()[axis],
                q_d_d_steps: npath.targets()[axis]
            })
            .collect();

        let output = OutputData { axes };

        self.report = StatusReport {
            substeps,
            cmds_applied: input_data.cmds.len(),
            qd_clamp_events:
                npath.qd_clamp_events().iter().sum::<u64>()
                - qd_clamps_before,
            qdd_clamp_events:
                npath.qdd_clamp_events().iter().sum::<u64>()
                - qdd_clamps_before
        };
        self.output = Some(output.clone());

        Ok((output, self.report))
    }
}

impl WinchSet {
    /// The output of the most recent cycle, `None` before the first.
    pub fn last_output(&self) -> Option<OutputData> {
        self.output.clone()
    }
}

impl Archived for WinchSet {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref output) = self.output {
            for record in &output.axes {
                self.arch_axes.serialise(record)?;
            }
        }

        Ok(())
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
        let mut winch_set = WinchSet::default();

        let result = winch_set.proc(&InputData::default());

        assert!(matches!(result, Err(WinchSetError::NotInitialised)));
    }
}
