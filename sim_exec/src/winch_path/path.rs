//! Scalar path generator for a single winch

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use util::maths::clamp;

use super::SUBSTEP_S;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path generator for a single winch axis.
///
/// A second-order simple harmonic oscillator tracking a reference position
/// and velocity, with hard limits on velocity and acceleration. State should
/// be read directly but mutated only through the command API and
/// [`Path::step`], which maintain the servo's internal consistency.
#[derive(Debug, Clone, Copy)]
pub struct Path {
    /// Current model position.
    ///
    /// Units: steps
    pub q: f64,

    /// Current model velocity.
    ///
    /// Units: steps/second
    pub qd: f64,

    /// Current model acceleration.
    ///
    /// Units: steps/second^2
    pub qdd: f64,

    /// Reference position.
    ///
    /// Units: steps
    pub q_d: f64,

    /// Reference velocity, integrated into the reference position each step.
    ///
    /// Units: steps/second
    pub qd_d: f64,

    /// Elapsed model time.
    ///
    /// Units: seconds
    pub t: f64,

    /// Proportional feedback gain.
    ///
    /// Units: 1/second^2
    pub k: f64,

    /// Derivative feedback gain.
    ///
    /// Units: 1/second
    pub b: f64,

    /// Maximum allowable velocity.
    ///
    /// Units: steps/second
    pub qd_max: f64,

    /// Maximum allowable acceleration.
    ///
    /// Units: steps/second^2
    pub qdd_max: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Path {
    fn default() -> Self {
        Path {
            q: 0.0,
            qd: 0.0,
            qdd: 0.0,
            q_d: 0.0,
            qd_d: 0.0,
            t: 0.0,
            k: 4.0 * std::f64::consts::PI * std::f64::consts::PI,
            b: 1.0,
            qd_max: 3500.0,
            qdd_max: 35000.0
        }
    }
}

impl Path {
    pub fn new() -> Self {
        Path::default()
    }

    /// Run the generator for the given interval.
    ///
    /// The interval is truncated to a whole number of fixed sub-steps of
    /// [`SUBSTEP_S`]; any remainder below one sub-step is silently dropped.
    pub fn update_for_interval(&mut self, interval_s: f64) {
        let steps = (interval_s / SUBSTEP_S).floor() as u64;

        for _ in 0..steps {
            self.step(SUBSTEP_S);
        }
    }

    /// Advance the servo model by one time step.
    pub fn step(&mut self, dt: f64) {
        // Calculate the acceleration, clamped within range for safety
        self.qdd = clamp(
            self.k * (self.q_d - self.q) + self.b * (self.qd_d - self.qd),
            -self.qdd_max,
            self.qdd_max);

        // Integrate one time step, including the reference velocity into the
        // reference position
        self.q += self.qd * dt;
        self.qd += self.qdd * dt;
        self.q_d += self.qd_d * dt;
        self.t += dt;

        // Clamp the model velocity within range for safety
        self.qd = clamp(self.qd, -self.qd_max, self.qd_max);
    }

    // ---- COMMAND API ----
    //
    // Mimics the serial interface of the actual winches. Setters mutate only
    // reference and gain fields, never the velocity state.

    /// Set the absolute reference position.
    pub fn set_target(&mut self, position_steps: f64) {
        self.q_d = position_steps;
    }

    /// Add a signed offset to the reference position.
    pub fn increment_target(&mut self, offset_steps: f64) {
        self.q_d += offset_steps;
    }

    /// Set the constant velocity of the reference position.
    pub fn set_velocity(&mut self, velocity_steps_s: f64) {
        self.qd_d = velocity_steps_s;
    }

    /// Set the second-order gains in terms of natural frequency (Hz) and
    /// damping ratio (1.0 at critical damping).
    pub fn set_freq_damping(&mut self, freq_hz: f64, damping_ratio: f64) {
        self.k = freq_hz * freq_hz
            * 4.0 * std::f64::consts::PI * std::f64::consts::PI;
        self.b = 2.0 * self.k.sqrt() * damping_ratio;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_zero_error_fixed_point() {
        let mut path = Path::new();

        path.step(SUBSTEP_S);

        // With zero position and velocity error nothing moves, only time
        // advances
        assert_eq!(path.q, 0.0);
        assert_eq!(path.qd, 0.0);
        assert_eq!(path.qdd, 0.0);
        assert_eq!(path.t, SUBSTEP_S);
    }

    #[test]
    fn test_clamps_hold_under_large_error() {
        let mut path = Path::new();
        path.set_target(1.0e9);

        for _ in 0..100 {
            path.step(SUBSTEP_S);

            assert!(path.qdd.abs() <= path.qdd_max);
            assert!(path.qd.abs() <= path.qd_max);
        }

        // The huge error saturates both limits exactly
        assert_eq!(path.qdd, path.qdd_max);
        assert_eq!(path.qd, path.qd_max);
    }

    #[test]
    fn test_freq_damping_conversion() {
        let mut path = Path::new();

        path.set_freq_damping(1.0, 1.0);

        assert!((path.k - 4.0 * PI * PI).abs() < 1e-12);
        assert!((path.b - 2.0 * path.k.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_reference_velocity_integration() {
        let mut path = Path::new();

        path.set_velocity(10.0);
        path.step(SUBSTEP_S);

        // The reference position ramps at the reference velocity
        assert!((path.q_d - 10.0 * SUBSTEP_S).abs() < 1e-12);
    }

    #[test]
    fn test_update_for_interval_drops_remainder() {
        let mut path = Path::new();

        // Below one sub-step: no integration at all
        path.update_for_interval(0.5 * SUBSTEP_S);
        assert_eq!(path.t, 0.0);

        // Two and a half sub-steps: exactly two run
        path.update_for_interval(2.5 * SUBSTEP_S);
        assert!((path.t - 2.0 * SUBSTEP_S).abs() < 1e-12);
    }

    #[test]
    fn test_converges_to_target() {
        let mut path = Path::new();
        path.set_freq_damping(1.0, 1.0);
        path.set_target(100.0);

        path.update_for_interval(10.0);

        // Critically damped servo settles on the reference
        assert!((path.q - 100.0).abs() < 0.1, "q = {}", path.q);
        assert!(path.qd.abs() < 0.1);
    }
}
