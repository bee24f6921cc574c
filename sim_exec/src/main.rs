//! Main simulation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logger, and parameters
//!     - Build the selected scenario (pendulum rigs plus winch set)
//!     - Main loop:
//!         - Pendulum simulation processing per rig
//!         - World endpoint snapshot refresh
//!         - Winch set processing
//!         - Archive writing
//!         - Cycle time management
//!
//! # Modules
//!
//! All modules (e.g. `dbl_pend`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State`
//!        trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use sim_lib::{
    dbl_pend::{self, PendSim},
    scenario::{Scenario, World, RigSpec},
    winch_path::{self, WinchCmd, WinchSet}};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// Internal
use sim_lib::dbl_pend::WorldView;
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the executive itself.
#[derive(Debug, Clone, Deserialize)]
struct ExecParams {
    /// Name of the scenario to run, may be overridden on the command line.
    scenario: String,

    /// Simulated time advanced per cycle.
    ///
    /// Units: seconds
    frame_interval_s: f64,

    /// Target wall-clock period of one cycle.
    ///
    /// Units: seconds
    cycle_period_s: f64,

    /// Total simulated duration to run for.
    ///
    /// Units: seconds
    run_duration_s: f64
}

/// Summary of the run saved as a JSON snapshot at shutdown.
#[derive(Serialize)]
struct FinalState {
    scenario: Scenario,
    num_cycles: u64,
    pendulums: Vec<Option<dbl_pend::OutputData>>,
    winches: Option<winch_path::OutputData>
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "sim_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Pendulum/Winch Simulation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load(
        "sim_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- SELECT SCENARIO ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // A single argument overrides the scenario from the parameter file
    let scenario: Scenario = match args.len() {
        1 => exec_params.scenario.parse()
            .wrap_err("Invalid scenario in exec params")?,
        2 => args[1].parse()
            .wrap_err("Invalid scenario on command line")?,
        _ => return Err(eyre!(
            "Expected either zero or one argument, found {}", args.len() - 1))
    };

    info!("Running scenario {:?}\n", scenario);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    // The world is owned here; controllers only hold weak handles onto it
    let world = Rc::new(RefCell::new(World::new(scenario.num_rigs())));
    let world_view: Rc<RefCell<dyn WorldView>> = world.clone();

    let mut pend_sims: Vec<PendSim> = Vec::new();

    for (index, rig) in scenario
        .build_rigs(&world_view)
        .into_iter()
        .enumerate()
    {
        let RigSpec { origin_m, controller } = rig;

        let mut pend_sim = PendSim::default();
        pend_sim.init(
            dbl_pend::InitData {
                params_path: "dbl_pend.toml",
                origin_m,
                controller,
                arch_name: format!("pend_{}.csv", index)
            },
            &session
        ).wrap_err_with(|| format!("Failed to initialise PendSim {}", index))?;

        info!("PendSim {} init complete, origin {:?}", index, origin_m);
        pend_sims.push(pend_sim);
    }

    let mut winch_set = WinchSet::default();
    winch_set.init("winch_set.toml", &session)
        .wrap_err("Failed to initialise WinchSet")?;
    info!("WinchSet init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    let num_cycles =
        (exec_params.run_duration_s / exec_params.frame_interval_s)
            .ceil() as u64;

    let pend_input = dbl_pend::InputData {
        frame_interval_s: exec_params.frame_interval_s
    };

    let mut num_consec_cycle_overruns: u64 = 0;

    for cycle in 0..num_cycles {

        // Get the cycle start time
        let cycle_start_instant = Instant::now();

        // ---- PENDULUM PROCESSING ----

        for (index, pend_sim) in pend_sims.iter_mut().enumerate() {
            match pend_sim.proc(&pend_input) {
                Ok((output, report)) => {
                    // Refresh the world's endpoint snapshot for this rig
                    world.borrow_mut().set_endpoint(
                        index,
                        nalgebra::Vector2::new(
                            output.end_x_m, output.end_y_m));

                    debug!(
                        "PendSim {}: {} steps, E = {:.3} J",
                        index, report.inner_steps, report.energy_j);
                }
                Err(e) => warn!("PendSim {} processing error: {}", index, e)
            }
        }

        // ---- WINCH PROCESSING ----

        // Halfway through the run, demonstrate the command interface by
        // ramping the first winch one revolution (800 steps) out
        let cmds = if cycle == num_cycles / 2 {
            vec![
                WinchCmd::SetSpeed { axis: 0, speed_steps_s: 400.0 },
                WinchCmd::IncrementTarget { axis: 0, offset_steps: 800.0 },
            ]
        }
        else {
            Vec::new()
        };

        let winch_input = winch_path::InputData {
            interval_s: exec_params.frame_interval_s,
            cmds
        };

        match winch_set.proc(&winch_input) {
            Ok((_, report)) => {
                if report.qd_clamp_events > 0 || report.qdd_clamp_events > 0 {
                    warn!(
                        "WinchSet clamping: {} velocity, {} acceleration \
                         events",
                        report.qd_clamp_events, report.qdd_clamp_events);
                }
            }
            Err(e) => warn!("WinchSet processing error: {}", e)
        }

        // ---- WRITE ARCHIVES ----

        for pend_sim in pend_sims.iter_mut() {
            if let Err(e) = pend_sim.write() {
                warn!("PendSim archive error: {}", e);
            }
        }
        if let Err(e) = winch_set.write() {
            warn!("WinchSet archive error: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(exec_params.cycle_period_s)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - exec_params.cycle_period_s);
                num_consec_cycle_overruns += 1;

                if num_consec_cycle_overruns > 500 {
                    return Err(eyre!(
                        "More than 500 consecutive cycle overruns"));
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("Run complete after {} cycles", num_cycles);

    let final_state = FinalState {
        scenario,
        num_cycles,
        pendulums: pend_sims.iter().map(|p| p.last_output()).collect(),
        winches: winch_set.last_output()
    };

    session.save("final_state.json", &final_state);

    Ok(())
}
