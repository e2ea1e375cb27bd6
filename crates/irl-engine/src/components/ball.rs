use glam::Vec2;

use crate::api::types::BallId;
use crate::components::color_range::ColorRange;
use crate::core::physics::{
    BodyDesc, ColliderDesc, ColliderMaterial, JointDesc, PhysicsBody, PhysicsWorld,
};

/// Outline color of a ball, RGB.
pub type BallColor = [u8; 3];

/// A ball's live presence in the physics space. Its ground joints hang off
/// `body` and go with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallBinding {
    pub body: PhysicsBody,
    /// Collider radius at bind time.
    pub radius: f32,
}

/// Parameters for creating a ball's dynamic body and its two ground joints.
#[derive(Debug, Clone, Copy)]
pub struct BindParams {
    pub material: ColliderMaterial,
    /// Anchor force limit; zero or less creates no anchor.
    pub anchor_max_force: f32,
    /// Rotational damping force limit; zero or less creates no damping joint.
    pub damping_max_force: f32,
    /// Balls at or above this radius are not bound.
    pub max_radius: f32,
}

/// One physical ball: identity, calibration window, last sighting and
/// optional physics binding.
#[derive(Debug, Clone)]
pub struct TrackedBall {
    pub id: BallId,
    pub name: String,
    pub color: BallColor,
    pub range: ColorRange,
    /// Last detected center in frame pixels. Stale when the ball was not seen.
    pub last_position: Vec2,
    /// Last detected radius in pixels. Zero until the first detection.
    pub last_radius: f32,
    pub binding: Option<BallBinding>,
}

impl TrackedBall {
    pub fn new(id: BallId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: [255, 255, 255],
            range: ColorRange::full(),
            last_position: Vec2::ZERO,
            last_radius: 0.0,
            binding: None,
        }
    }

    // -- Builder pattern --

    pub fn with_color(mut self, color: BallColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_range(mut self, range: ColorRange) -> Self {
        self.range = range;
        self
    }

    /// Record a fresh sighting. Overwrites unconditionally.
    pub fn update_detection(&mut self, position: Vec2, radius: f32) {
        self.last_position = position;
        self.last_radius = radius;
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Create a dynamic body at the last sighting, tied to the ground by an
    /// anchor and a rotational damper. Any previous binding is released first.
    ///
    /// Returns `false` (and leaves the ball unbound) when the last radius fails
    /// the sanity bound.
    pub fn bind_to_physics(&mut self, world: &mut PhysicsWorld, params: &BindParams) -> bool {
        self.unbind(world);

        if !(self.last_radius > 0.0 && self.last_radius < params.max_radius) {
            log::debug!(
                "{}: radius {:.1} outside bind range, not bound",
                self.name,
                self.last_radius
            );
            return false;
        }

        let desc = BodyDesc::dynamic(ColliderDesc::Ball {
            radius: self.last_radius,
        })
        .with_position(self.last_position)
        .with_ccd(true);
        let body = world.create_body(self.id, &desc, params.material);

        if params.anchor_max_force > 0.0 {
            world.create_ground_joint(
                &body,
                &JointDesc::Anchor {
                    anchor: self.last_position,
                    max_force: params.anchor_max_force,
                },
            );
        }
        if params.damping_max_force > 0.0 {
            world.create_ground_joint(
                &body,
                &JointDesc::AngularDamping {
                    max_force: params.damping_max_force,
                },
            );
        }

        self.binding = Some(BallBinding {
            body,
            radius: self.last_radius,
        });
        true
    }

    /// Drop the body and its joints, if any.
    pub fn unbind(&mut self, world: &mut PhysicsWorld) {
        if let Some(binding) = self.binding.take() {
            // Removing the body also removes every joint attached to it.
            world.remove_body(&binding.body);
        }
    }

    /// Simulated center and collider radius, if bound.
    pub fn simulated(&self, world: &PhysicsWorld) -> Option<(Vec2, f32)> {
        let binding = self.binding.as_ref()?;
        let (pos, _) = world.body_position(&binding.body);
        Some((pos, binding.radius))
    }

    /// Simulated state, only when the bound radius passes the sanity bound.
    pub fn simulated_within(&self, world: &PhysicsWorld, max_radius: f32) -> Option<(Vec2, f32)> {
        self.simulated(world).filter(|&(_, r)| r < max_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BindParams {
        BindParams {
            material: ColliderMaterial::default(),
            anchor_max_force: 1000.0,
            damping_max_force: 5.0e7,
            max_radius: 240.0,
        }
    }

    #[test]
    fn builder_sets_fields() {
        let ball = TrackedBall::new(BallId(2), "Red")
            .with_color([255, 0, 0])
            .with_range(ColorRange::new((0, 10), (100, 255), (100, 255)));
        assert_eq!(ball.name, "Red");
        assert_eq!(ball.color, [255, 0, 0]);
        assert_eq!(ball.range.h_max, 10);
        assert_eq!(ball.last_radius, 0.0);
        assert!(!ball.is_bound());
    }

    #[test]
    fn update_detection_is_idempotent() {
        let mut once = TrackedBall::new(BallId(0), "Yellow");
        once.update_detection(Vec2::new(10.0, 20.0), 15.0);

        let mut twice = TrackedBall::new(BallId(0), "Yellow");
        twice.update_detection(Vec2::new(10.0, 20.0), 15.0);
        twice.update_detection(Vec2::new(10.0, 20.0), 15.0);

        assert_eq!(once.last_position, twice.last_position);
        assert_eq!(once.last_radius, twice.last_radius);
    }

    #[test]
    fn bind_creates_body_and_two_joints() {
        let mut world = PhysicsWorld::default();
        let mut ball = TrackedBall::new(BallId(0), "Yellow");
        ball.update_detection(Vec2::new(100.0, 100.0), 15.0);

        assert!(ball.bind_to_physics(&mut world, &params()));
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 2);

        let (pos, radius) = ball.simulated(&world).unwrap();
        assert_eq!(pos, Vec2::new(100.0, 100.0));
        assert_eq!(radius, 15.0);
    }

    #[test]
    fn rebinding_releases_previous_body() {
        let mut world = PhysicsWorld::default();
        let mut ball = TrackedBall::new(BallId(0), "Yellow");
        ball.update_detection(Vec2::new(100.0, 100.0), 15.0);

        for _ in 0..3 {
            assert!(ball.bind_to_physics(&mut world, &params()));
        }
        assert_eq!(world.body_count(), 1, "Old bodies must not leak");
        assert_eq!(world.joint_count(), 2, "Old joints must not leak");
    }

    #[test]
    fn oversized_radius_is_not_bound() {
        let mut world = PhysicsWorld::default();
        let mut ball = TrackedBall::new(BallId(0), "Yellow");
        ball.update_detection(Vec2::new(100.0, 100.0), 15.0);
        assert!(ball.bind_to_physics(&mut world, &params()));

        ball.update_detection(Vec2::new(100.0, 100.0), 240.0);
        assert!(!ball.bind_to_physics(&mut world, &params()));
        assert!(!ball.is_bound());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn never_detected_ball_is_not_bound() {
        let mut world = PhysicsWorld::default();
        let mut ball = TrackedBall::new(BallId(0), "Yellow");
        assert!(!ball.bind_to_physics(&mut world, &params()));
    }

    #[test]
    fn zero_force_limits_skip_joints() {
        let mut world = PhysicsWorld::default();
        let mut ball = TrackedBall::new(BallId(0), "Yellow");
        ball.update_detection(Vec2::new(100.0, 100.0), 15.0);
        let p = BindParams {
            anchor_max_force: 0.0,
            damping_max_force: 0.0,
            ..params()
        };
        assert!(ball.bind_to_physics(&mut world, &p));
        assert_eq!(world.joint_count(), 0);
        assert!(ball.is_bound());
    }

    #[test]
    fn simulated_within_applies_sanity_bound() {
        let mut world = PhysicsWorld::default();
        let mut ball = TrackedBall::new(BallId(0), "Yellow");
        ball.update_detection(Vec2::new(100.0, 100.0), 15.0);
        ball.bind_to_physics(&mut world, &params());
        assert!(ball.simulated_within(&world, 16.0).is_some());
        assert!(ball.simulated_within(&world, 15.0).is_none());
    }
}
