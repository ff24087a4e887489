//! Scripted cart-pole used by the demo run.
//!
//! Kinematic only: the cart slides sinusoidally along the rail and the pole
//! swings about the cart's Y axis.  Good enough to watch frames move in the
//! viewer without a physics engine.

use std::f64::consts::TAU;

use meshbridge_geometry::{Quaternion, RigidTransform, Rgba, Vec3};
use meshbridge_runtime::PoseSource;
use meshbridge_types::{GeometryMessage, LinkMessage, LoadMessage, PoseBundle};

const RAIL: &str = "cart_pole::rail";
const CART: &str = "cart_pole::cart";
const POLE: &str = "cart_pole::pole";

const RAIL_LENGTH: f64 = 4.0;
const POLE_LENGTH: f64 = 1.0;
const CART_HEIGHT: f64 = 0.1;

const CART_AMPLITUDE: f64 = 1.2;
const CART_PERIOD_S: f64 = 4.0;
const POLE_AMPLITUDE_RAD: f64 = 0.6;
const POLE_PERIOD_S: f64 = 2.3;

/// Engine-side geometry for the three cart-pole links.
pub fn load_message() -> LoadMessage {
    let grey = Rgba::opaque(0.6, 0.6, 0.6);
    let blue = Rgba::opaque(0.2, 0.3, 0.9);
    let red = Rgba::opaque(0.9, 0.1, 0.1);

    LoadMessage::new(vec![
        LinkMessage::new(RAIL)
            .with_geometry(GeometryMessage::boxed(RAIL_LENGTH, 0.04, 0.04).with_color(grey)),
        LinkMessage::new(CART).with_geometry(
            GeometryMessage::boxed(0.3, 0.2, CART_HEIGHT).with_color(blue),
        ),
        // Pole frame sits at the pivot; the rod hangs off it along +Z.
        LinkMessage::new(POLE)
            .with_geometry(
                GeometryMessage::cylinder(0.02, POLE_LENGTH)
                    .with_color(Rgba::new(0.9, 0.6, 0.1, 0.8))
                    .with_pose(RigidTransform::from_translation(Vec3::new(0.0, 0.0, POLE_LENGTH / 2.0))),
            )
            .with_geometry(
                GeometryMessage::sphere(0.05)
                    .with_color(red)
                    .with_pose(RigidTransform::from_translation(Vec3::new(0.0, 0.0, POLE_LENGTH))),
            ),
    ])
}

/// Pose source following the scripted trajectory.
pub struct CartPole {
    bundle: PoseBundle,
}

impl CartPole {
    pub fn new() -> Self {
        let mut bundle = PoseBundle::with_capacity(3);
        for name in [RAIL, CART, POLE] {
            bundle.push(name, RigidTransform::identity());
        }
        Self { bundle }
    }

    pub fn cart_position(time: f64) -> f64 {
        CART_AMPLITUDE * (TAU * time / CART_PERIOD_S).sin()
    }

    pub fn pole_angle(time: f64) -> f64 {
        POLE_AMPLITUDE_RAD * (TAU * time / POLE_PERIOD_S).sin()
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSource for CartPole {
    fn pose_bundle(&mut self, time: f64) -> &PoseBundle {
        let cart = Vec3::new(Self::cart_position(time), 0.0, 0.0);
        let pivot = cart.add(Vec3::new(0.0, 0.0, CART_HEIGHT / 2.0));
        let swing = Quaternion::from_axis_angle(Vec3::unit_y(), Self::pole_angle(time));

        self.bundle.set_pose(1, RigidTransform::from_translation(cart));
        self.bundle.set_pose(2, RigidTransform::new(pivot, swing));
        &self.bundle
    }
}
