//! Controller strategies for the double pendulum
//!
//! A controller is a pure strategy object invoked once per inner integration
//! step to populate the applied joint torques. Controllers that need to place
//! the endpoint own a copy of the arm geometry (received in `setup`) and
//! solve the inverse kinematics themselves; controllers that coordinate
//! between rigs query the shared world through a non-owning handle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cell::RefCell;
use std::rc::Weak;

use log::info;
use nalgebra::{Vector2, Vector4};

// Internal
use util::maths::lin_map;

use super::ArmKinematics;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Interval between keyframe changes.
///
/// Units: seconds
const KEYFRAME_INTERVAL_S: f64 = 1.5;

/// Inner steps between periodic spiral status messages.
const SPIRAL_REPORT_STEPS: u64 = 1000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Sink for operator-visible controller messages.
pub trait Console {
    fn write(&mut self, message: &str);
}

/// Read access to cross-rig information shared through the executive.
///
/// Controllers hold this behind a `Weak` handle so the world is never kept
/// alive by a controller, and queries degrade to `None` once the world is
/// gone.
pub trait WorldView {
    /// World position of another rig's endpoint, `None` if no such rig.
    fn pendulum_endpoint(&self, index: usize) -> Option<Vector2<f64>>;

    /// Publish a world-coordinate marker, for example a tracking target.
    fn set_marker(&mut self, index: usize, position_m: Vector2<f64>);
}

/// Torque policy for a [`super::DoublePendulumSim`].
///
/// `compute_control` is total: it must succeed for any finite state and must
/// leave `tau` fully populated every call.
pub trait PendulumController {
    /// The state the simulator is reset to, `[q1, q2, qd1, qd2]`.
    fn initial_state(&self) -> Vector4<f64>;

    /// One-time configuration hook, called before the simulation starts with
    /// the kinematic model of the arm being controlled.
    fn setup(&mut self, _kin: ArmKinematics) {}

    /// Calculate the next step of applied torques.
    ///
    /// `t` is the simulated time in seconds, `dt` the inner step length,
    /// `state` the current `[q1, q2, qd1, qd2]` vector. The torques to apply
    /// are written into `tau`.
    fn compute_control(
        &mut self,
        t: f64,
        dt: f64,
        state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    );
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Default console which routes messages to the log.
#[derive(Default)]
pub struct LogConsole;

/// Controller applying no torque at all, used for free-swing demonstrations
/// and the energy conservation tests.
pub struct ZeroTorqueController {
    initial_state: Vector4<f64>
}

/// Fixed-setpoint proportional-derivative position controller, no integral
/// term.
pub struct PdController {
    /// Proportional position gains per joint.
    pub kp: Vector2<f64>,

    /// Velocity damping gains per joint.
    pub kd: Vector2<f64>,

    /// Target state `[q1, q2, qd1, qd2]`.
    pub target: Vector4<f64>,

    initial_state: Vector4<f64>
}

/// Swing-up controller using only the shoulder actuator.
///
/// Applies one of three policies depending on state: a small constant kick
/// torque when completely at rest near the bottom, unstable positive
/// velocity feedback near the bottom to pump energy into the swing, and
/// simulated friction elsewhere. The elbow is unpowered apart from the
/// simulated friction.
pub struct SwingUpController {
    /// Friction damping coefficient, negative.
    pub friction_damping: f64,

    /// Positive velocity feedback gain used near the bottom.
    pub velocity_gain: f64
}

/// Cycles through a fixed table of joint-space poses at regular intervals,
/// applying PD control toward the current keyframe.
pub struct KeyframeController {
    /// The pose table, `(q1, q2)` pairs.
    keyframes: Vec<Vector2<f64>>,

    kp: Vector2<f64>,
    kd: Vector2<f64>,

    last_frame: Option<u64>,
    console: Box<dyn Console>
}

/// Drives the endpoint along a slowly breathing spiral path via inverse
/// kinematics, publishing the current target as a world marker.
pub struct SpiralController {
    kp: Vector2<f64>,
    kd: Vector2<f64>,

    /// World-coordinate centre of the spiral.
    pub centre_m: Vector2<f64>,

    /// Index of the world marker to publish the target on.
    pub marker_index: usize,

    kin: Option<ArmKinematics>,
    world: Weak<RefCell<dyn WorldView>>,
    timestep: u64,
    console: Box<dyn Console>
}

/// Observes another rig's endpoint through the world and tracks it with the
/// opposite-elbow inverse kinematics branch.
pub struct MirrorController {
    kp: Vector2<f64>,
    kd: Vector2<f64>,

    /// Index of the rig to mirror.
    pub source_index: usize,

    kin: Option<ArmKinematics>,
    world: Weak<RefCell<dyn WorldView>>
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply PD control toward a target state, writing the torques into `tau`.
///
/// `tau[i] = kp[i]*(target[i] - state[i]) + kd[i]*(target[i+2] - state[i+2])`
pub fn pd_control(
    kp: &Vector2<f64>,
    kd: &Vector2<f64>,
    target: &Vector4<f64>,
    state: &Vector4<f64>,
    tau: &mut Vector2<f64>
) {
    let qerr = target - state;

    tau[0] = kp[0] * qerr[0] + kd[0] * qerr[2];
    tau[1] = kp[1] * qerr[1] + kd[1] * qerr[3];
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Console for LogConsole {
    fn write(&mut self, message: &str) {
        info!("{}", message);
    }
}

impl ZeroTorqueController {
    pub fn new(initial_state: Vector4<f64>) -> Self {
        ZeroTorqueController { initial_state }
    }
}

impl PendulumController for ZeroTorqueController {
    fn initial_state(&self) -> Vector4<f64> {
        self.initial_state
    }

    fn compute_control(
        &mut self,
        _t: f64,
        _dt: f64,
        _state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    ) {
        tau.fill(0.0);
    }
}

impl Default for PdController {
    fn default() -> Self {
        PdController {
            kp: Vector2::new(16.0, 8.0),
            kd: Vector2::new(4.0, 2.0),
            target: Vector4::new(
                1.0, 0.5 * std::f64::consts::PI, 0.0, 0.0),
            initial_state: Vector4::zeros()
        }
    }
}

impl PdController {
    /// Default gains and target, starting from the given state.
    pub fn with_initial_state(initial_state: Vector4<f64>) -> Self {
        PdController {
            initial_state,
            ..Default::default()
        }
    }
}

impl PendulumController for PdController {
    fn initial_state(&self) -> Vector4<f64> {
        self.initial_state
    }

    fn compute_control(
        &mut self,
        _t: f64,
        _dt: f64,
        state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    ) {
        pd_control(&self.kp, &self.kd, &self.target, state, tau);
    }
}

impl Default for SwingUpController {
    fn default() -> Self {
        SwingUpController {
            friction_damping: -0.2,
            velocity_gain: 2.0
        }
    }
}

impl PendulumController for SwingUpController {
    fn initial_state(&self) -> Vector4<f64> {
        // Hanging at rest, so the kick policy starts the swing
        Vector4::zeros()
    }

    fn compute_control(
        &mut self,
        _t: f64,
        _dt: f64,
        state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    ) {
        let q1 = state[0];
        let qd1 = state[2];
        let qd2 = state[3];

        // Pump the swinging motion using only the shoulder joint. If
        // completely at rest, a slight perturbation kick-starts the process.
        if qd1.abs() < 0.01 && q1.abs() < 0.01 {
            tau[0] = 1.0;
        }
        // Unstable positive velocity feedback near the bottom
        else if q1.abs() < 0.5 {
            tau[0] = self.velocity_gain * qd1;
        }
        // Otherwise coast, applying simulated friction
        else {
            tau[0] = self.friction_damping * qd1;
        }

        // The elbow is unpowered but sees simulated friction
        tau[1] = self.friction_damping * qd2;
    }
}

impl KeyframeController {
    /// Create a controller cycling over the given poses. Default PD gains.
    pub fn new(keyframes: Vec<Vector2<f64>>) -> Self {
        KeyframeController {
            keyframes,
            kp: Vector2::new(16.0, 8.0),
            kd: Vector2::new(4.0, 2.0),
            last_frame: None,
            console: Box::new(LogConsole)
        }
    }

    /// Replace the console used for frame-change messages.
    pub fn connect_console(&mut self, console: Box<dyn Console>) {
        self.console = console;
    }

    /// Set one joint of one keyframe from a normalised `[0, 1]` value,
    /// mapped onto a full `[-pi, pi]` revolution. Out-of-range pose indices
    /// are ignored.
    pub fn set_keyframe_normalised(
        &mut self, pose: usize, joint: usize, value: f64
    ) {
        if let Some(keyframe) = self.keyframes.get_mut(pose) {
            keyframe[joint] = lin_map(
                (0.0, 1.0),
                (-std::f64::consts::PI, std::f64::consts::PI),
                value);
        }
    }
}

impl PendulumController for KeyframeController {
    fn initial_state(&self) -> Vector4<f64> {
        Vector4::zeros()
    }

    fn compute_control(
        &mut self,
        t: f64,
        _dt: f64,
        state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    ) {
        // Select the current keyframe based on the time, looping over the
        // available poses
        let frame = (t / KEYFRAME_INTERVAL_S).floor() as u64;

        if self.last_frame != Some(frame) {
            self.console.write(&format!("Starting frame {}", frame));
        }
        self.last_frame = Some(frame);

        let pose = self.keyframes[frame as usize % self.keyframes.len()];

        // Extend the pose with zero target velocity
        let target = Vector4::new(pose[0], pose[1], 0.0, 0.0);

        pd_control(&self.kp, &self.kd, &target, state, tau);
    }
}

impl SpiralController {
    /// Create a controller spiralling around the given world-coordinate
    /// centre, publishing the target on the given marker.
    pub fn new(
        centre_m: Vector2<f64>,
        marker_index: usize,
        world: Weak<RefCell<dyn WorldView>>
    ) -> Self {
        SpiralController {
            kp: Vector2::new(100.0, 50.0),
            kd: Vector2::new(16.0, 8.0),
            centre_m,
            marker_index,
            kin: None,
            world,
            timestep: 0,
            console: Box::new(LogConsole)
        }
    }

    /// The world-coordinate spiral target at a given time.
    ///
    /// The phase cycles one revolution every 8 seconds while the radius
    /// slowly breathes up and down.
    pub fn target_endpoint(&self, t: f64) -> Vector2<f64> {
        let phase = 0.25 * std::f64::consts::PI * t;
        let radius = 0.1 + 0.5 * (0.05 * t).sin().abs();

        self.centre_m + Vector2::new(
            radius * phase.cos(),
            radius * phase.sin())
    }
}

impl PendulumController for SpiralController {
    fn initial_state(&self) -> Vector4<f64> {
        Vector4::zeros()
    }

    fn setup(&mut self, kin: ArmKinematics) {
        self.kin = Some(kin);
    }

    fn compute_control(
        &mut self,
        t: f64,
        _dt: f64,
        state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    ) {
        let kin = match self.kin {
            Some(kin) => kin,
            // Not configured, apply no torque
            None => {
                tau.fill(0.0);
                return;
            }
        };

        let end = self.target_endpoint(t);

        // Solve for the joint angles of the endpoint, arbitrarily taking the
        // elbow-up branch as the target pose
        let pose = kin.endpoint_ik(&end).elbow_up;
        let target = Vector4::new(pose[0], pose[1], 0.0, 0.0);

        pd_control(&self.kp, &self.kd, &target, state, tau);

        if self.timestep % SPIRAL_REPORT_STEPS == 0 {
            self.console.write(&format!(
                "Time: {:.3}  endpoint: [{:.3}, {:.3}]", t, end[0], end[1]));
        }
        self.timestep += 1;

        if let Some(world) = self.world.upgrade() {
            world.borrow_mut().set_marker(self.marker_index, end);
        }
    }
}

impl MirrorController {
    /// Create a controller tracking the endpoint of another rig.
    pub fn new(
        source_index: usize,
        world: Weak<RefCell<dyn WorldView>>
    ) -> Self {
        MirrorController {
            kp: Vector2::new(100.0, 50.0),
            kd: Vector2::new(16.0, 8.0),
            source_index,
            kin: None,
            world
        }
    }
}

impl PendulumController for MirrorController {
    fn initial_state(&self) -> Vector4<f64> {
        Vector4::zeros()
    }

    fn setup(&mut self, kin: ArmKinematics) {
        self.kin = Some(kin);
    }

    fn compute_control(
        &mut self,
        _t: f64,
        _dt: f64,
        state: &Vector4<f64>,
        tau: &mut Vector2<f64>
    ) {
        let end = self.world
            .upgrade()
            .and_then(|world| world
                .borrow()
                .pendulum_endpoint(self.source_index));

        // Track the observed endpoint with the opposite elbow branch. If the
        // world or the source rig is unavailable, coast torque-free.
        match (self.kin, end) {
            (Some(kin), Some(end)) => {
                let pose = kin.endpoint_ik(&end).elbow_down;
                let target = Vector4::new(pose[0], pose[1], 0.0, 0.0);

                pd_control(&self.kp, &self.kd, &target, state, tau);
            }
            _ => tau.fill(0.0)
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::dbl_pend::{DoublePendulumSim, Params, INNER_STEP_S};

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_pd_converges_without_gravity() {
        let params = Params {
            gravity_mss: 0.0,
            ..Default::default()
        };
        let controller = PdController::default();
        let target = controller.target;

        let mut sim = DoublePendulumSim::new(
            &params, Vector2::zeros(), Box::new(controller));

        sim.timer_tick(20.0);

        // Without gravity there is no steady-state disturbance torque, so
        // the PD loop converges onto the setpoint itself
        let state = sim.state();
        assert!((state[0] - target[0]).abs() < 0.01,
            "q1 did not converge: {}", state[0]);
        assert!((state[1] - target[1]).abs() < 0.01,
            "q2 did not converge: {}", state[1]);
        assert!(state[2].abs() < 0.01);
        assert!(state[3].abs() < 0.01);
    }

    #[test]
    fn test_pd_settles_with_gravity() {
        let mut sim = DoublePendulumSim::new(
            &Params::default(),
            Vector2::zeros(),
            Box::new(PdController::default()));

        sim.timer_tick(30.0);

        // Gravity leaves a steady-state offset, but the motion must have
        // settled and moved towards the setpoint
        let state = sim.state();
        assert!(state[2].abs() < 0.05, "q1 still moving: {}", state[2]);
        assert!(state[3].abs() < 0.05, "q2 still moving: {}", state[3]);
        assert!(state[0] > 0.2, "q1 did not move toward target: {}", state[0]);
    }

    #[test]
    fn test_swing_up_kick_starts_from_rest() {
        let mut sim = DoublePendulumSim::new(
            &Params::default(),
            Vector2::zeros(),
            Box::new(SwingUpController::default()));

        // One inner step: the kick torque must accelerate the shoulder
        sim.timer_tick(INNER_STEP_S);
        assert!(sim.state()[2] > 0.0);
    }

    #[test]
    fn test_swing_up_pumps_energy() {
        let mut sim = DoublePendulumSim::new(
            &Params::default(),
            Vector2::zeros(),
            Box::new(SwingUpController::default()));

        let rest_energy = sim.total_energy();

        sim.timer_tick(20.0);

        // The positive velocity feedback must have pumped a visible amount
        // of mechanical energy into the swing
        assert!(sim.total_energy() > rest_energy + 1.0,
            "energy not pumped: {} vs rest {}",
            sim.total_energy(), rest_energy);
    }

    #[test]
    fn test_keyframe_selection() {
        let mut controller = KeyframeController::new(vec![
            Vector2::new(0.5, 0.0),
            Vector2::new(-0.5, 0.0),
        ]);

        let state = Vector4::zeros();
        let mut tau = Vector2::zeros();

        // First frame targets q1 = 0.5: tau1 = kp1 * 0.5
        controller.compute_control(0.0, INNER_STEP_S, &state, &mut tau);
        assert!((tau[0] - 8.0).abs() < 1e-12);

        // Past one interval the second frame targets q1 = -0.5
        controller.compute_control(1.6, INNER_STEP_S, &state, &mut tau);
        assert!((tau[0] + 8.0).abs() < 1e-12);

        // The table loops
        controller.compute_control(3.1, INNER_STEP_S, &state, &mut tau);
        assert!((tau[0] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_keyframe_normalised_setter() {
        let mut controller = KeyframeController::new(vec![Vector2::zeros()]);

        controller.set_keyframe_normalised(0, 0, 0.75);
        controller.set_keyframe_normalised(0, 1, 0.5);

        // Out of range pose index is ignored
        controller.set_keyframe_normalised(7, 0, 1.0);

        assert!((controller.keyframes[0][0] - 0.5 * PI).abs() < 1e-12);
        assert!(controller.keyframes[0][1].abs() < 1e-12);
    }

    #[test]
    fn test_spiral_target_geometry() {
        let controller = SpiralController::new(
            Vector2::new(1.0, 0.0), 0, Weak::<RefCell<TestWorld>>::new());

        // At t = 0 the radius is 0.1 and the phase is zero
        let end = controller.target_endpoint(0.0);
        assert!((end - Vector2::new(1.1, 0.0)).norm() < 1e-12);

        // The target never leaves the breathing annulus
        for i in 0..200 {
            let end = controller.target_endpoint(i as f64 * 0.1);
            let radius = (end - Vector2::new(1.0, 0.0)).norm();
            assert!(radius >= 0.1 - 1e-9 && radius <= 0.6 + 1e-9);
        }
    }

    struct TestWorld {
        endpoint: Vector2<f64>,
        markers: Vec<(usize, Vector2<f64>)>
    }

    impl WorldView for TestWorld {
        fn pendulum_endpoint(&self, index: usize) -> Option<Vector2<f64>> {
            if index == 0 { Some(self.endpoint) } else { None }
        }

        fn set_marker(&mut self, index: usize, position_m: Vector2<f64>) {
            self.markers.push((index, position_m));
        }
    }

    #[test]
    fn test_mirror_tracks_world_endpoint() {
        use std::rc::Rc;

        let world: Rc<RefCell<TestWorld>> = Rc::new(RefCell::new(TestWorld {
            endpoint: Vector2::new(0.7, -0.9),
            markers: Vec::new()
        }));
        let world_view: Rc<RefCell<dyn WorldView>> = world.clone();

        let mut controller = MirrorController::new(
            0, Rc::downgrade(&world_view));
        controller.setup(ArmKinematics::new(
            &Params::default(), Vector2::zeros()));

        // Torques push a hanging arm towards the elbow-down IK pose of the
        // observed endpoint
        let kin = ArmKinematics::new(&Params::default(), Vector2::zeros());
        let pose = kin.endpoint_ik(&Vector2::new(0.7, -0.9)).elbow_down;

        let state = Vector4::zeros();
        let mut tau = Vector2::zeros();
        controller.compute_control(0.0, INNER_STEP_S, &state, &mut tau);

        assert!((tau[0] - 100.0 * pose[0]).abs() < 1e-9);
        assert!((tau[1] - 50.0 * pose[1]).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_coasts_without_world() {
        let mut controller = MirrorController::new(
            0, Weak::<RefCell<TestWorld>>::new());
        controller.setup(ArmKinematics::new(
            &Params::default(), Vector2::zeros()));

        let state = Vector4::new(0.5, 0.5, 1.0, 1.0);
        let mut tau = Vector2::new(3.0, 3.0);
        controller.compute_control(0.0, INNER_STEP_S, &state, &mut tau);

        assert_eq!(tau, Vector2::zeros());
    }
}
