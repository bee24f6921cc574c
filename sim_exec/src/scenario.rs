//! # Demonstration scenarios
//!
//! A scenario selects which controllers are attached to which pendulum rigs
//! and where the rigs stand in the world. The world itself is the small
//! shared blackboard through which rigs coordinate: the executive refreshes
//! each rig's endpoint after every frame, and controllers publish tracking
//! markers into it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use nalgebra::Vector2;
use serde::Serialize;
use thiserror::Error;

// Internal
use crate::dbl_pend::{
    KeyframeController, MirrorController, PdController, PendulumController,
    SpiralController, SwingUpController, WorldView, ZeroTorqueController};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The available demonstration scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scenario {
    /// A single unactuated pendulum released from a displaced pose.
    Free,

    /// A single pendulum holding a fixed setpoint under PD control.
    Pd,

    /// A single pendulum pumping itself upright with the shoulder actuator.
    SwingUp,

    /// A single pendulum cycling through a table of keyframed poses.
    Keyframes,

    /// Two pendulums: one traces a spiral endpoint path, the other mirrors
    /// its endpoint through the world.
    Spirals
}

/// Possible errors when selecting a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Unknown scenario {0:?}, expected one of \
             free, pd, swingup, keyframes, spirals")]
    UnknownScenario(String)
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared world state used for cross-rig coordination.
///
/// Owned by the executive behind an `Rc<RefCell<_>>`; controllers hold only
/// `Weak` handles onto it.
#[derive(Default)]
pub struct World {
    /// Latest endpoint snapshot per rig, refreshed by the executive after
    /// each frame.
    endpoints: Vec<Option<Vector2<f64>>>,

    /// Markers published by controllers, such as tracking targets.
    markers: Vec<Option<Vector2<f64>>>
}

/// One pendulum rig of a scenario: where it stands and what drives it.
pub struct RigSpec {
    /// World position of the rig's base.
    ///
    /// Units: meters
    pub origin_m: Vector2<f64>,

    /// The controller to attach.
    pub controller: Box<dyn PendulumController>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl World {
    pub fn new(num_rigs: usize) -> Self {
        World {
            endpoints: vec![None; num_rigs],
            markers: Vec::new()
        }
    }

    /// Record a rig's endpoint position. Out-of-range indices are ignored.
    pub fn set_endpoint(&mut self, index: usize, position_m: Vector2<f64>) {
        if let Some(endpoint) = self.endpoints.get_mut(index) {
            *endpoint = Some(position_m);
        }
    }

    /// The markers published so far, indexed by marker number.
    pub fn markers(&self) -> &[Option<Vector2<f64>>] {
        &self.markers
    }
}

impl WorldView for World {
    fn pendulum_endpoint(&self, index: usize) -> Option<Vector2<f64>> {
        self.endpoints.get(index).copied().flatten()
    }

    fn set_marker(&mut self, index: usize, position_m: Vector2<f64>) {
        if index >= self.markers.len() {
            self.markers.resize(index + 1, None);
        }
        self.markers[index] = Some(position_m);
    }
}

impl FromStr for Scenario {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Scenario::Free),
            "pd" => Ok(Scenario::Pd),
            "swingup" | "swing_up" => Ok(Scenario::SwingUp),
            "keyframes" => Ok(Scenario::Keyframes),
            "spirals" => Ok(Scenario::Spirals),
            other => Err(ScenarioError::UnknownScenario(other.to_string()))
        }
    }
}

impl Scenario {
    /// The number of pendulum rigs this scenario runs.
    pub fn num_rigs(&self) -> usize {
        match self {
            Scenario::Spirals => 2,
            _ => 1
        }
    }

    /// Build the rigs of this scenario around the given world.
    ///
    /// Controllers receive `Weak` handles only, so dropping the returned
    /// specs or the rigs built from them never keeps the world alive.
    pub fn build_rigs(
        &self, world: &Rc<RefCell<dyn WorldView>>
    ) -> Vec<RigSpec> {
        match self {
            Scenario::Free => vec![RigSpec {
                origin_m: Vector2::zeros(),
                controller: Box::new(ZeroTorqueController::new(
                    nalgebra::Vector4::new(1.0, 0.5, 0.0, 0.0)))
            }],

            Scenario::Pd => vec![RigSpec {
                origin_m: Vector2::zeros(),
                controller: Box::new(PdController::default())
            }],

            Scenario::SwingUp => vec![RigSpec {
                origin_m: Vector2::zeros(),
                controller: Box::new(SwingUpController::default())
            }],

            Scenario::Keyframes => vec![RigSpec {
                origin_m: Vector2::zeros(),
                controller: Box::new(KeyframeController::new(vec![
                    Vector2::new(0.0, 0.0),
                    Vector2::new(1.0, 0.5),
                    Vector2::new(-1.0, -0.5),
                    Vector2::new(0.5, -1.0),
                ]))
            }],

            // Two rigs two meters apart, spiralling around the midpoint
            Scenario::Spirals => {
                let world_handle: Weak<RefCell<dyn WorldView>> =
                    Rc::downgrade(world);

                vec![
                    RigSpec {
                        origin_m: Vector2::zeros(),
                        controller: Box::new(SpiralController::new(
                            Vector2::new(1.0, 0.0),
                            0,
                            world_handle.clone()))
                    },
                    RigSpec {
                        origin_m: Vector2::new(2.0, 0.0),
                        controller: Box::new(MirrorController::new(
                            0,
                            world_handle))
                    },
                ]
            }
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
    fn test_scenario_parsing() {
        assert_eq!("pd".parse::<Scenario>().unwrap(), Scenario::Pd);
        assert_eq!("SwingUp".parse::<Scenario>().unwrap(), Scenario::SwingUp);
        assert_eq!("spirals".parse::<Scenario>().unwrap(), Scenario::Spirals);

        assert!(matches!(
            "juggling".parse::<Scenario>(),
            Err(ScenarioError::UnknownScenario(_))));
    }

    #[test]
    fn test_world_endpoint_queries() {
        let mut world = World::new(2);

        assert_eq!(world.pendulum_endpoint(0), None);
        assert_eq!(world.pendulum_endpoint(5), None);

        world.set_endpoint(0, Vector2::new(0.7, -0.9));
        assert_eq!(
            world.pendulum_endpoint(0),
            Some(Vector2::new(0.7, -0.9)));

        // Out of range writes are ignored
        world.set_endpoint(5, Vector2::zeros());
        assert_eq!(world.pendulum_endpoint(5), None);
    }

    #[test]
    fn test_world_markers_grow() {
        let mut world = World::new(1);

        world.set_marker(2, Vector2::new(1.0, 1.0));

        assert_eq!(world.markers().len(), 3);
        assert_eq!(world.markers()[0], None);
        assert_eq!(world.markers()[2], Some(Vector2::new(1.0, 1.0)));
    }

    #[test]
    fn test_spirals_builds_two_rigs() {
        let world: Rc<RefCell<dyn WorldView>> =
            Rc::new(RefCell::new(World::new(2)));

        let rigs = Scenario::Spirals.build_rigs(&world);

        assert_eq!(rigs.len(), 2);
        assert_eq!(rigs[0].origin_m, Vector2::zeros());
        assert_eq!(rigs[1].origin_m, Vector2::new(2.0, 0.0));
    }
}
