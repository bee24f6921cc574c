//! Implementation of the double pendulum simulator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector4};

// Internal
use super::{ArmKinematics, IkSolutions, Params, PendulumController, INNER_STEP_S};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Numerical dynamic simulation of a frictionless double pendulum.
///
/// The dynamic state is `[q1, q2, qd1, qd2]`: the two joint angles in
/// radians followed by the two joint velocities in radians/second. The state
/// is owned exclusively by the simulator and mutated only by the integration
/// step; the attached controller writes the applied torques once per inner
/// step.
pub struct DoublePendulumSim {
    /// Rigid-body parameters.
    params: Params,

    /// Link 1 moment of inertia, derived once from the parameters.
    i1: f64,

    /// Link 2 moment of inertia, derived once from the parameters.
    i2: f64,

    /// Kinematic model (link lengths and world origin).
    kin: ArmKinematics,

    /// Controller supplying the applied joint torques.
    controller: Box<dyn PendulumController>,

    /// Simulated time since the last reset.
    ///
    /// Units: seconds
    t_s: f64,

    /// Dynamic state `[q1, q2, qd1, qd2]`.
    ///
    /// Units: radians, radians/second
    state: Vector4<f64>,

    /// Joint torques applied during the current inner step. Written by the
    /// controller, consumed by the derivative calculation, not persisted.
    ///
    /// Units: newton meters
    tau: Vector2<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DoublePendulumSim {
    /// Create a new simulator with the given parameters and controller,
    /// based at the given world origin.
    ///
    /// The controller's one-time `setup` hook is invoked with the kinematic
    /// model and the simulator starts at the controller's initial state.
    pub fn new(
        params: &Params,
        origin_m: Vector2<f64>,
        mut controller: Box<dyn PendulumController>
    ) -> Self {
        let kin = ArmKinematics::new(params, origin_m);

        controller.setup(kin);

        let mut sim = DoublePendulumSim {
            params: *params,
            i1: params.i1(),
            i2: params.i2(),
            kin,
            controller,
            t_s: 0.0,
            state: Vector4::zeros(),
            tau: Vector2::zeros()
        };

        sim.reset();
        sim
    }

    /// Reset all transient simulation state.
    ///
    /// Time returns to zero, the state is restored from the controller's
    /// initial state, and the applied torques are cleared.
    pub fn reset(&mut self) {
        self.t_s = 0.0;
        self.state = self.controller.initial_state();
        self.tau = Vector2::zeros();
    }

    /// Run the simulation for an interval.
    ///
    /// The interval is truncated to a whole number of fixed inner steps of
    /// [`INNER_STEP_S`]; any remainder below one step is silently dropped.
    pub fn timer_tick(&mut self, delta_t_s: f64) {
        let steps = (delta_t_s / INNER_STEP_S).floor() as u64;

        for _ in 0..steps {
            // Calculate the next control outputs
            self.controller.compute_control(
                self.t_s, INNER_STEP_S, &self.state, &mut self.tau);

            // Calculate the dynamics model
            let dydt = self.deriv();

            // Euler integration
            self.state += INNER_STEP_S * dydt;
            self.t_s += INNER_STEP_S;
        }
    }

    /// Calculate the state derivative of the rigid-body dynamics model.
    ///
    /// Solves the joint-space equations of motion
    /// `D(q)*qdd + h(q, qd) + phi(q) = tau` for the accelerations using
    /// Cramer's rule. The determinant of `D` is only singular for degenerate
    /// (zero mass or length) parameters, which violate the module's
    /// preconditions.
    fn deriv(&self) -> Vector4<f64> {
        let q1 = self.state[0];
        let q2 = self.state[1];
        let qd1 = self.state[2];
        let qd2 = self.state[3];

        let l1 = self.params.l1_m;
        let lc1 = self.params.lc1_m;
        let lc2 = self.params.lc2_m;
        let m1 = self.params.m1_kg;
        let m2 = self.params.m2_kg;
        let g = self.params.gravity_mss;

        // Mass matrix
        let d11 = m1 * lc1 * lc1
            + m2 * (l1 * l1 + lc2 * lc2 + 2.0 * l1 * lc2 * q2.cos())
            + self.i1 + self.i2;
        let d12 = m2 * (lc2 * lc2 + l1 * lc2 * q2.cos()) + self.i2;
        let d21 = d12;
        let d22 = m2 * lc2 * lc2 + self.i2;

        // Coriolis and centrifugal terms
        let h1 = -m2 * l1 * lc2 * q2.sin() * qd2 * qd2
            - 2.0 * m2 * l1 * lc2 * q2.sin() * qd2 * qd1;
        let h2 = m2 * l1 * lc2 * q2.sin() * qd1 * qd1;

        // Gravity terms
        let phi1 = -m2 * lc2 * g * (q1 + q2).sin()
            - (m1 * lc1 + m2 * l1) * g * q1.sin();
        let phi2 = -m2 * lc2 * g * (q1 + q2).sin();

        let rhs1 = self.tau[0] - h1 - phi1;
        let rhs2 = self.tau[1] - h2 - phi2;

        // Cramer's rule: the numerator of qdd[n] is the determinant of the
        // mass matrix with its nth column replaced by the right hand side
        let denom = d11 * d22 - d21 * d12;

        Vector4::new(
            qd1,
            qd2,
            (rhs1 * d22 - rhs2 * d12) / denom,
            (d11 * rhs2 - d21 * rhs1) / denom)
    }

    /// Total mechanical energy (kinetic plus potential) of the current
    /// state.
    ///
    /// Units: joules
    ///
    /// The kinetic energy is the mass-matrix quadratic form; the potential
    /// reference is the shoulder joint height.
    pub fn total_energy(&self) -> f64 {
        let q1 = self.state[0];
        let q2 = self.state[1];
        let qd1 = self.state[2];
        let qd2 = self.state[3];

        let l1 = self.params.l1_m;
        let lc1 = self.params.lc1_m;
        let lc2 = self.params.lc2_m;
        let m1 = self.params.m1_kg;
        let m2 = self.params.m2_kg;
        let g = self.params.gravity_mss;

        let d11 = m1 * lc1 * lc1
            + m2 * (l1 * l1 + lc2 * lc2 + 2.0 * l1 * lc2 * q2.cos())
            + self.i1 + self.i2;
        let d12 = m2 * (lc2 * lc2 + l1 * lc2 * q2.cos()) + self.i2;
        let d22 = m2 * lc2 * lc2 + self.i2;

        let kinetic = 0.5 * d11 * qd1 * qd1
            + d12 * qd1 * qd2
            + 0.5 * d22 * qd2 * qd2;

        let potential = g * ((m1 * lc1 + m2 * l1) * q1.cos()
            + m2 * lc2 * (q1 + q2).cos());

        kinetic + potential
    }

    /// Compute the forward kinematics for a joint angle vector, returning
    /// the world positions of the elbow and endpoint.
    pub fn forward_kinematics(
        &self, q: &Vector2<f64>
    ) -> (Vector2<f64>, Vector2<f64>) {
        self.kin.forward(q)
    }

    /// Compute the two inverse kinematics solutions for a world-coordinate
    /// endpoint target. Out-of-reach targets saturate, see
    /// [`ArmKinematics::endpoint_ik`].
    pub fn endpoint_ik(&self, target_m: &Vector2<f64>) -> IkSolutions {
        self.kin.endpoint_ik(target_m)
    }

    /// World position of the endpoint for the current state.
    pub fn endpoint(&self) -> Vector2<f64> {
        self.kin.forward(&Vector2::new(self.state[0], self.state[1])).1
    }

    /// World position of the elbow for the current state.
    pub fn elbow(&self) -> Vector2<f64> {
        self.kin.forward(&Vector2::new(self.state[0], self.state[1])).0
    }

    /// The current dynamic state `[q1, q2, qd1, qd2]`.
    pub fn state(&self) -> &Vector4<f64> {
        &self.state
    }

    /// Simulated time since the last reset.
    pub fn time_s(&self) -> f64 {
        self.t_s
    }

    /// The kinematic model in use.
    pub fn kinematics(&self) -> ArmKinematics {
        self.kin
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::dbl_pend::controllers::ZeroTorqueController;

    fn free_pendulum(initial_state: Vector4<f64>) -> DoublePendulumSim {
        DoublePendulumSim::new(
            &Params::default(),
            Vector2::zeros(),
            Box::new(ZeroTorqueController::new(initial_state)))
    }

    #[test]
    fn test_hanging_equilibrium_is_fixed_point() {
        let mut sim = free_pendulum(Vector4::zeros());

        sim.timer_tick(1.0);

        // Hanging straight down is a stable equilibrium: the state must
        // remain exactly zero.
        assert_eq!(*sim.state(), Vector4::zeros());
        assert!((sim.time_s() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_approximately_conserved() {
        let mut sim = free_pendulum(Vector4::new(1.0, 0.5, 0.0, 0.0));

        let initial_energy = sim.total_energy();

        // Forward Euler drifts energy upward at a rate proportional to the
        // step size; over a short window the drift must stay bounded.
        let window_s = 0.2;
        sim.timer_tick(window_s);

        let drift = (sim.total_energy() - initial_energy).abs();
        assert!(
            drift < 2000.0 * INNER_STEP_S * window_s,
            "energy drift too large: {}", drift);
    }

    #[test]
    fn test_timer_tick_drops_remainder() {
        let mut sim = free_pendulum(Vector4::new(0.3, 0.0, 0.0, 0.0));

        // Shorter than one inner step: nothing happens
        sim.timer_tick(0.5 * INNER_STEP_S);
        assert_eq!(sim.time_s(), 0.0);
        assert_eq!(sim.state()[0], 0.3);

        // Ten whole steps plus a remainder: only the whole steps run
        sim.timer_tick(10.5 * INNER_STEP_S);
        assert!((sim.time_s() - 10.0 * INNER_STEP_S).abs() < 1e-12);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let initial = Vector4::new(0.8, -0.2, 0.0, 0.0);
        let mut sim = free_pendulum(initial);

        sim.timer_tick(0.5);
        assert_ne!(*sim.state(), initial);

        sim.reset();
        assert_eq!(*sim.state(), initial);
        assert_eq!(sim.time_s(), 0.0);
    }

    #[test]
    fn test_free_swing_moves() {
        let mut sim = free_pendulum(Vector4::new(1.0, 0.0, 0.0, 0.0));

        sim.timer_tick(0.1);

        // Gravity must accelerate the displaced pendulum towards hanging
        assert!(sim.state()[2] < 0.0);
        assert!(sim.state()[0] < 1.0);
    }
}
