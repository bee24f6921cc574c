//! Vectorised path generator for a set of winches

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::DVector;

// Internal
use util::maths::clamp;

use super::SUBSTEP_S;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path generators for a set of winch axes.
///
/// Runs the same second-order servo as [`super::Path`] independently per
/// axis, in single precision to match the arithmetic of the stepper firmware
/// it emulates, plus a piecewise-linear reference trajectory generator: the
/// reference position ramps toward a user target at a per-axis speed (steps
/// when the speed is unlimited).
///
/// Axis indices are a caller precondition; out-of-range indices panic.
pub struct NPath {
    /// Current model positions.
    ///
    /// Units: steps
    q: DVector<f32>,

    /// Current model velocities.
    ///
    /// Units: steps/second
    qd: DVector<f32>,

    /// Current model accelerations.
    ///
    /// Units: steps/second^2
    qdd: DVector<f32>,

    /// Reference positions.
    ///
    /// Units: steps
    q_d: DVector<f32>,

    /// Reference velocities.
    ///
    /// Units: steps/second
    qd_d: DVector<f32>,

    /// User-specified target positions driving the reference ramp.
    ///
    /// Units: steps
    q_d_d: DVector<f32>,

    /// User-specified ramp speeds, infinite for an unlimited (stepping)
    /// reference.
    ///
    /// Units: steps/second
    speed: DVector<f32>,

    /// Proportional feedback gains.
    ///
    /// Units: 1/second^2
    k: DVector<f32>,

    /// Derivative feedback gains.
    ///
    /// Units: 1/second
    b: DVector<f32>,

    /// Count of velocity clamp events per axis since construction.
    qd_clamp_events: Vec<u64>,

    /// Count of acceleration clamp events per axis since construction.
    qdd_clamp_events: Vec<u64>,

    /// Elapsed model time.
    ///
    /// Units: seconds
    pub t_s: f64,

    /// Maximum allowable velocity, common to all axes.
    ///
    /// Units: steps/second
    pub qd_max: f32,

    /// Maximum allowable acceleration, common to all axes.
    ///
    /// Units: steps/second^2
    pub qdd_max: f32
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NPath {
    /// Create a set of `num_axes` generators at rest at position zero, with
    /// unlimited ramp speed and default gains.
    pub fn new(num_axes: usize) -> Self {
        NPath {
            q: DVector::zeros(num_axes),
            qd: DVector::zeros(num_axes),
            qdd: DVector::zeros(num_axes),
            q_d: DVector::zeros(num_axes),
            qd_d: DVector::zeros(num_axes),
            q_d_d: DVector::zeros(num_axes),
            speed: DVector::from_element(num_axes, f32::INFINITY),
            k: DVector::from_element(
                num_axes,
                4.0 * std::f32::consts::PI * std::f32::consts::PI),
            b: DVector::from_element(num_axes, 1.0),
            qd_clamp_events: vec![0; num_axes],
            qdd_clamp_events: vec![0; num_axes],
            t_s: 0.0,
            qd_max: 3500.0,
            qdd_max: 35000.0
        }
    }

    /// Number of axes in the set.
    pub fn num_axes(&self) -> usize {
        self.q.len()
    }

    /// Current winch positions.
    ///
    /// Units: steps
    pub fn positions(&self) -> &DVector<f32> {
        &self.q
    }

    /// Current winch velocities.
    ///
    /// Units: steps/second
    pub fn velocities(&self) -> &DVector<f32> {
        &self.qd
    }

    /// Current reference positions.
    ///
    /// Units: steps
    pub fn references(&self) -> &DVector<f32> {
        &self.q_d
    }

    /// Current user target positions.
    ///
    /// Units: steps
    pub fn targets(&self) -> &DVector<f32> {
        &self.q_d_d
    }

    /// Per-axis counts of velocity clamp events since construction.
    pub fn qd_clamp_events(&self) -> &[u64] {
        &self.qd_clamp_events
    }

    /// Per-axis counts of acceleration clamp events since construction.
    pub fn qdd_clamp_events(&self) -> &[u64] {
        &self.qdd_clamp_events
    }

    /// Run the generators for the given interval.
    ///
    /// The interval is truncated to a whole number of fixed sub-steps of
    /// [`SUBSTEP_S`]; any remainder below one sub-step is silently dropped.
    pub fn update_for_interval(&mut self, interval_s: f64) {
        let steps = (interval_s / SUBSTEP_S).floor() as u64;

        for _ in 0..steps {
            self.step(SUBSTEP_S as f32);
        }
    }

    /// Advance all axes by one time step.
    pub fn step(&mut self, dt: f32) {
        for i in 0..self.q.len() {
            // Calculate the acceleration, clamped within range for safety
            let qdd = self.k[i] * (self.q_d[i] - self.q[i])
                + self.b[i] * (self.qd_d[i] - self.qd[i]);
            self.qdd[i] = clamp(qdd, -self.qdd_max, self.qdd_max);
            if self.qdd[i] != qdd {
                self.qdd_clamp_events[i] += 1;
            }

            // Integrate one time step
            self.q[i] += self.qd[i] * dt;
            let qd = self.qd[i] + self.qdd[i] * dt;

            // Clamp the model velocity within range for safety
            self.qd[i] = clamp(qd, -self.qd_max, self.qd_max);
            if self.qd[i] != qd {
                self.qd_clamp_events[i] += 1;
            }

            // Update the reference trajectory by linear interpolation toward
            // the user target, bounded by the ramp speed. An unlimited speed
            // makes the reference step straight onto the target.
            let err = self.q_d_d[i] - self.q_d[i];
            let sign: f32 = if err > 0.0 {
                1.0
            }
            else if err < 0.0 {
                -1.0
            }
            else {
                0.0
            };

            self.q_d[i] += sign * f32::min(self.speed[i] * dt, err.abs());

            // Zero reference velocity if the error is zero or the speed is
            // unlimited, else the signed speed
            self.qd_d[i] = if self.speed[i].is_infinite() {
                0.0
            }
            else {
                sign * self.speed[i]
            };
        }

        self.t_s += dt as f64;
    }

    // ---- COMMAND API ----
    //
    // Mimics the serial interface of the actual winches. Setters mutate only
    // reference and gain fields, never the velocity state.

    /// Set the absolute target position of one axis.
    pub fn set_target(&mut self, axis: usize, position_steps: f32) {
        self.q_d_d[axis] = position_steps;
    }

    /// Add a signed offset to the target position of one axis.
    pub fn increment_target(&mut self, axis: usize, offset_steps: f32) {
        self.q_d_d[axis] += offset_steps;
    }

    /// Add a signed offset to the reference position of one axis.
    ///
    /// This applies a triangular impulse: the reference makes a step, then
    /// ramps back toward the target.
    pub fn increment_reference(&mut self, axis: usize, offset_steps: f32) {
        self.q_d[axis] += offset_steps;
    }

    /// Set the ramp speed of one axis. Speeds of zero or below are treated
    /// as unlimited, making the reference move in steps instead of ramps.
    pub fn set_speed(&mut self, axis: usize, speed_steps_s: f32) {
        self.speed[axis] = if speed_steps_s <= 0.0 {
            f32::INFINITY
        }
        else {
            speed_steps_s
        };
    }

    /// Set the second-order gains of one axis in terms of natural frequency
    /// (Hz) and damping ratio (1.0 at critical damping).
    pub fn set_freq_damping(
        &mut self, axis: usize, freq_hz: f32, damping_ratio: f32
    ) {
        let new_k = freq_hz * freq_hz
            * 4.0 * std::f32::consts::PI * std::f32::consts::PI;

        self.k[axis] = new_k;
        self.b[axis] = 2.0 * new_k.sqrt() * damping_ratio;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PI: f32 = std::f32::consts::PI;
    const DT: f32 = SUBSTEP_S as f32;

    #[test]
    fn test_new_defaults() {
        let npath = NPath::new(4);

        assert_eq!(npath.num_axes(), 4);
        assert!(npath.positions().iter().all(|&q| q == 0.0));
        assert!(npath.speed.iter().all(|s| s.is_infinite()));
        assert!(npath.k.iter().all(|&k| (k - 4.0 * PI * PI).abs() < 1e-4));
        assert!(npath.b.iter().all(|&b| b == 1.0));
    }

    #[test]
    fn test_reference_ramp_bounded_by_speed() {
        let mut npath = NPath::new(2);

        npath.set_target(0, 100.0);
        npath.set_speed(0, 10.0);

        npath.step(DT);

        // The reference moves by at most speed*dt toward the target and the
        // reference velocity carries the signed speed
        assert!((npath.references()[0] - 10.0 * DT).abs() < 1e-6);
        assert_eq!(npath.qd_d[0], 10.0);

        // The untouched axis does not move
        assert_eq!(npath.references()[1], 0.0);
        assert_eq!(npath.positions()[1], 0.0);
    }

    #[test]
    fn test_unlimited_speed_steps_reference() {
        let mut npath = NPath::new(1);

        npath.set_target(0, 42.0);
        npath.step(DT);

        // With unlimited speed the reference jumps straight onto the target
        // and the reference velocity stays zero
        assert_eq!(npath.references()[0], 42.0);
        assert_eq!(npath.qd_d[0], 0.0);
    }

    #[test]
    fn test_zero_error_zero_reference_velocity() {
        let mut npath = NPath::new(1);

        npath.set_speed(0, 10.0);
        npath.step(DT);

        // Zero error with a finite speed must not produce a phantom ramp
        assert_eq!(npath.qd_d[0], 0.0);
        assert_eq!(npath.references()[0], 0.0);
    }

    #[test]
    fn test_clamp_events_counted() {
        let mut npath = NPath::new(2);

        npath.set_target(0, 1.0e8);
        npath.update_for_interval(0.5);

        assert!(npath.qdd_clamp_events()[0] > 0);
        assert!(npath.qd_clamp_events()[0] > 0);
        assert!(npath.velocities()[0].abs() <= npath.qd_max);

        // The idle axis never clamps
        assert_eq!(npath.qdd_clamp_events()[1], 0);
        assert_eq!(npath.qd_clamp_events()[1], 0);
    }

    #[test]
    fn test_nonpositive_speed_is_unlimited() {
        let mut npath = NPath::new(1);

        npath.set_speed(0, 5.0);
        npath.set_speed(0, 0.0);
        assert!(npath.speed[0].is_infinite());

        npath.set_speed(0, -3.0);
        assert!(npath.speed[0].is_infinite());
    }

    #[test]
    fn test_freq_damping_conversion() {
        let mut npath = NPath::new(2);

        npath.set_freq_damping(1, 1.0, 1.0);

        let k = npath.k[1];
        assert!((k - 4.0 * PI * PI).abs() < 1e-4);
        assert!((npath.b[1] - 2.0 * k.sqrt()).abs() < 1e-4);

        // Other axes keep their gains
        assert_eq!(npath.b[0], 1.0);
    }

    #[test]
    fn test_update_for_interval_drops_remainder() {
        let mut npath = NPath::new(1);

        npath.update_for_interval(0.0005);
        assert_eq!(npath.t_s, 0.0);

        npath.update_for_interval(0.012);
        assert!((npath.t_s - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_tracks_ramped_target() {
        let mut npath = NPath::new(1);

        npath.set_freq_damping(0, 1.0, 1.0);
        npath.set_speed(0, 50.0);
        npath.set_target(0, 100.0);

        npath.update_for_interval(10.0);

        // 2 s of ramp plus settling leaves the axis on target
        assert!((npath.positions()[0] - 100.0).abs() < 0.5,
            "q = {}", npath.positions()[0]);
        assert!(npath.velocities()[0].abs() < 0.5);
    }
}
