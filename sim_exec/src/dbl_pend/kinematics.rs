//! Closed-form kinematics for the two-link planar arm
//!
//! Joint angles are measured from the -Y axis (a pendulum hanging straight
//! down is at zero), with the elbow angle relative to the proximal link.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of a two-link planar arm, placed at an origin in world
/// coordinates.
///
/// This is a small `Copy` value so controllers that need kinematics queries
/// own their own copy rather than holding a reference back into the
/// simulator.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArmKinematics {
    /// Proximal link length.
    ///
    /// Units: meters
    pub l1_m: f64,

    /// Distal link length.
    ///
    /// Units: meters
    pub l2_m: f64,

    /// Position of the arm base in world coordinates.
    ///
    /// Units: meters
    pub origin_m: Vector2<f64>
}

/// The pair of inverse kinematics solutions for an endpoint target.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IkSolutions {
    /// Solution with a positive elbow angle.
    ///
    /// Units: radians
    pub elbow_up: Vector2<f64>,

    /// Solution with a negative elbow angle.
    ///
    /// Units: radians
    pub elbow_down: Vector2<f64>,

    /// True if the target was out of reach and the elbow angle was
    /// saturated to the closest achievable pose.
    pub saturated: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmKinematics {
    /// Create the kinematic model from the dynamics parameters, with the arm
    /// base at the given world position.
    pub fn new(params: &Params, origin_m: Vector2<f64>) -> Self {
        ArmKinematics {
            l1_m: params.l1_m,
            l2_m: params.l2_m,
            origin_m
        }
    }

    /// Compute the forward kinematics.
    ///
    /// Returns the world-coordinate Cartesian positions of the elbow and the
    /// endpoint for the given joint angle vector.
    pub fn forward(&self, q: &Vector2<f64>) -> (Vector2<f64>, Vector2<f64>) {
        let elbow = self.origin_m
            + Vector2::new(
                self.l1_m * q[0].sin(),
                -self.l1_m * q[0].cos());

        let end = elbow
            + Vector2::new(
                self.l2_m * (q[0] + q[1]).sin(),
                -self.l2_m * (q[0] + q[1]).cos());

        (elbow, end)
    }

    /// Compute the two inverse kinematics solutions for a target endpoint
    /// position in world coordinates.
    ///
    /// If the target is out of reach the law-of-cosines argument saturates
    /// and the closest achievable pose is returned (arm fully extended or
    /// fully folded); this is defined behaviour, not an error, and the
    /// result is flagged in [`IkSolutions::saturated`].
    pub fn endpoint_ik(&self, target_m: &Vector2<f64>) -> IkSolutions {
        // Translate the target into body coordinates
        let target = target_m - self.origin_m;

        // Position of the target point in polar coordinates. Theta is the
        // angle of the target w.r.t. the -Y axis, same origin as the arm.
        let radius_sq = target.dot(&target);
        let radius = radius_sq.sqrt();
        let theta = f64::atan2(target[0], -target[1]);

        // Use the law of cosines to compute the elbow angle:
        //   R^2 = l1^2 + l2^2 - 2*l1*l2*cos(pi - elbow)
        // both elbow and -elbow are valid solutions.
        let acos_arg = (radius_sq - self.l1_m * self.l1_m - self.l2_m * self.l2_m)
            / (-2.0 * self.l1_m * self.l2_m);

        let saturated = acos_arg < -1.0 || acos_arg > 1.0;
        let elbow_supplement = if acos_arg < -1.0 {
            std::f64::consts::PI
        }
        else if acos_arg > 1.0 {
            0.0
        }
        else {
            acos_arg.acos()
        };

        // Use the law of sines to find the angle at the bottom vertex of the
        // triangle defined by the links:
        //   radius / sin(elbow_supplement) = l2 / sin(alpha)
        let alpha = if radius > 0.0 {
            (self.l2_m * elbow_supplement.sin() / radius).asin()
        }
        else {
            0.0
        };

        // The two solutions have opposite elbow sign
        IkSolutions {
            elbow_up: Vector2::new(
                theta - alpha,
                std::f64::consts::PI - elbow_supplement),
            elbow_down: Vector2::new(
                theta + alpha,
                elbow_supplement - std::f64::consts::PI),
            saturated
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    fn unit_arm() -> ArmKinematics {
        ArmKinematics::new(&Params::default(), Vector2::zeros())
    }

    #[test]
    fn test_forward_hanging() {
        let kin = unit_arm();
        let (elbow, end) = kin.forward(&Vector2::zeros());

        assert!((elbow - Vector2::new(0.0, -1.0)).norm() < 1e-12);
        assert!((end - Vector2::new(0.0, -2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_ik_round_trip() {
        let kin = unit_arm();

        for target in &[
            Vector2::new(0.7, -0.9),
            Vector2::new(-1.2, -0.3),
            Vector2::new(0.1, 1.4),
            Vector2::new(1.5, 0.5),
        ] {
            let solutions = kin.endpoint_ik(target);
            assert!(!solutions.saturated);

            let (_, end_up) = kin.forward(&solutions.elbow_up);
            let (_, end_down) = kin.forward(&solutions.elbow_down);

            assert!((end_up - target).norm() < 1e-9,
                "elbow up solution misses target {:?}", target);
            assert!((end_down - target).norm() < 1e-9,
                "elbow down solution misses target {:?}", target);
        }
    }

    #[test]
    fn test_ik_unreachable_saturates() {
        let kin = unit_arm();

        // Radius 3 is beyond the 2 m reach: the arm should point at the
        // target fully extended, without NaNs.
        let target = Vector2::new(3.0, 0.0);
        let solutions = kin.endpoint_ik(&target);

        assert!(solutions.saturated);
        assert!(solutions.elbow_up.iter().all(|v| v.is_finite()));
        assert!(solutions.elbow_down.iter().all(|v| v.is_finite()));

        // Fully extended arm: zero elbow angle on both branches
        assert!(solutions.elbow_up[1].abs() < 1e-12);
        assert!(solutions.elbow_down[1].abs() < 1e-12);

        // The endpoint lands on the reach boundary towards the target
        let (_, end) = kin.forward(&solutions.elbow_up);
        assert!((end - Vector2::new(2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_ik_origin_target() {
        let kin = unit_arm();

        // Degenerate zero-radius target for equal link lengths: the arm
        // folds back on itself, alpha is defined to be zero.
        let solutions = kin.endpoint_ik(&Vector2::zeros());

        assert!(!solutions.saturated);
        assert!((solutions.elbow_up[1].abs() - PI).abs() < 1e-12);

        let (_, end) = kin.forward(&solutions.elbow_up);
        assert!(end.norm() < 1e-9);
    }

    #[test]
    fn test_offset_origin() {
        let kin = ArmKinematics::new(
            &Params::default(), Vector2::new(2.2, 0.0));

        let target = Vector2::new(2.9, -0.9);
        let solutions = kin.endpoint_ik(&target);
        let (_, end) = kin.forward(&solutions.elbow_down);

        assert!((end - target).norm() < 1e-9);
    }
}
