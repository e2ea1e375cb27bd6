use glam::Vec2;
use rapier2d::prelude::*;
use std::sync::Mutex;

use crate::api::types::BallId;

// ---------------------------------------------------------------------------
// Conversion helpers (private): glam to nalgebra
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn vec2_to_point(v: Vec2) -> nalgebra::Point2<f32> {
    nalgebra::Point2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn na_iso_to_pos_rot(iso: &nalgebra::Isometry2<f32>) -> (Vec2, f32) {
    let pos = Vec2::new(iso.translation.x, iso.translation.y);
    let rot = iso.rotation.angle();
    (pos, rot)
}

/// Damping factor of the joint velocity motors. High enough that the motors
/// behave as velocity constraints limited only by their max force.
const MOTOR_FACTOR: f32 = 1.0e3;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Dynamic,
    Fixed,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Fixed => RigidBodyType::Fixed,
        }
    }
}

/// Collider category. Both kinds collide with each other and with themselves;
/// the tag only identifies the parties of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColliderKind {
    Ball = 1,
    Edge = 2,
}

/// Shape description for a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    /// A thick segment between two body-local points.
    Edge { a: Vec2, b: Vec2, radius: f32 },
}

impl ColliderDesc {
    fn build_collider(&self) -> ColliderBuilder {
        match *self {
            ColliderDesc::Ball { radius } => ColliderBuilder::ball(radius),
            ColliderDesc::Edge { a, b, radius } => {
                ColliderBuilder::capsule_from_endpoints(vec2_to_point(a), vec2_to_point(b), radius)
            }
        }
    }

    fn kind(&self) -> ColliderKind {
        match self {
            ColliderDesc::Ball { .. } => ColliderKind::Ball,
            ColliderDesc::Edge { .. } => ColliderKind::Edge,
        }
    }
}

/// Physical material properties for a collider.
///
/// Restitution and friction combine multiplicatively between two colliders.
#[derive(Debug, Clone, Copy)]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub friction: f32,
    /// Total mass given to the collider. Ignored for fixed bodies.
    pub mass: f32,
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.7,
            friction: 0.8,
            mass: 10.0,
        }
    }
}

/// Builder for describing a rigid body before creation.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub ccd: bool,
    pub collider: ColliderDesc,
}

impl BodyDesc {
    /// Create a dynamic body description with the given collider shape.
    pub fn dynamic(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            ccd: false,
            collider,
        }
    }

    /// Create a fixed (static) body description with the given collider shape.
    pub fn fixed(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Fixed,
            position: Vec2::ZERO,
            ccd: false,
            collider,
        }
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }
}

/// Handle pair stored on a tracked ball, referencing Rapier internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// Description of a joint tying a body to the static ground.
#[derive(Debug, Clone, Copy)]
pub enum JointDesc {
    /// Holds the body's linear velocity at zero relative to a world anchor,
    /// giving way once the required force exceeds `max_force`. No positional
    /// correction is applied, so a displaced body stays where it ends up.
    Anchor { anchor: Vec2, max_force: f32 },
    /// Holds the body's angular velocity at zero up to `max_force`.
    AngularDamping { max_force: f32 },
}

/// One side of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactParty {
    Ball(BallId),
    Edge,
}

/// A collision event between two colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub a: ContactParty,
    pub b: ContactParty,
    /// `true` when the collision just started, `false` when it ended.
    pub started: bool,
}

impl CollisionPair {
    #[cfg(test)]
    /// Ball ids taking part in this contact.
    pub fn balls(&self) -> impl Iterator<Item = BallId> {
        [self.a, self.b].into_iter().filter_map(|party| match party {
            ContactParty::Ball(id) => Some(id),
            ContactParty::Edge => None,
        })
    }
}

// Collider user_data layout: kind in the high 64 bits, ball id in the low bits.
fn encode_user_data(kind: ColliderKind, id: BallId) -> u128 {
    ((kind as u128) << 64) | id.0 as u128
}

fn decode_user_data(data: u128) -> Option<ContactParty> {
    match (data >> 64) as u8 {
        k if k == ColliderKind::Ball as u8 => Some(ContactParty::Ball(BallId(data as u32))),
        k if k == ColliderKind::Edge as u8 => Some(ContactParty::Edge),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Event collector
// ---------------------------------------------------------------------------

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        let mut guard = self.collisions.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Wraps all Rapier2D boilerplate into a single struct.
///
/// Owns a fixed, collider-less ground body that anchor and damping joints
/// attach to.
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
    ground: RigidBodyHandle,
}

impl PhysicsWorld {
    /// Create a new physics world with the given gravity vector.
    /// The table is viewed from above, so callers normally pass `Vec2::ZERO`.
    pub fn new(gravity: Vec2) -> Self {
        let mut bodies = RigidBodySet::new();
        let ground = bodies.insert(RigidBodyBuilder::fixed().build());
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
            ground,
        }
    }

    /// Set the integration timestep.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Create a rigid body + collider and return handles.
    /// The BallId is stored in the collider's `user_data` for collision lookups.
    pub fn create_body(
        &mut self,
        ball_id: BallId,
        desc: &BodyDesc,
        material: ColliderMaterial,
    ) -> PhysicsBody {
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(vec2_to_na(desc.position))
            .ccd_enabled(desc.ccd)
            .build();

        let body_handle = self.bodies.insert(rb);

        let mut builder = desc
            .collider
            .build_collider()
            .restitution(material.restitution)
            .friction(material.friction)
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(encode_user_data(desc.collider.kind(), ball_id));
        if desc.body_type == BodyType::Dynamic {
            builder = builder.mass(material.mass);
        }

        let collider_handle =
            self.colliders
                .insert_with_parent(builder.build(), body_handle, &mut self.bodies);

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Build the four immovable edges of a `width` × `height` playing surface.
    /// Edges run along x = 1, y = 1, x = width and y = height.
    pub fn create_boundary(
        &mut self,
        width: f32,
        height: f32,
        thickness: f32,
        material: ColliderMaterial,
    ) -> Vec<PhysicsBody> {
        let edges = [
            (Vec2::new(1.0, 1.0), Vec2::new(1.0, height)),
            (Vec2::new(1.0, 1.0), Vec2::new(width, 1.0)),
            (Vec2::new(width, 1.0), Vec2::new(width, height)),
            (Vec2::new(1.0, height), Vec2::new(width, height)),
        ];
        edges
            .iter()
            .map(|&(a, b)| {
                let desc = BodyDesc::fixed(ColliderDesc::Edge { a, b, radius: thickness });
                self.create_body(BallId(u32::MAX), &desc, material)
            })
            .collect()
    }

    /// Remove a body, its colliders and every joint attached to it.
    pub fn remove_body(&mut self, body: &PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Step the simulation and collect collision events into the provided Vec.
    pub fn step_into(&mut self, collision_events: &mut Vec<CollisionPair>) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        for event in self.event_collector.drain_collisions() {
            let (h1, h2, started) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };

            let party_a = self.collider_party(h1);
            let party_b = self.collider_party(h2);

            if let (Some(a), Some(b)) = (party_a, party_b) {
                collision_events.push(CollisionPair { a, b, started });
            }
        }
    }

    /// Apply an instantaneous impulse at a world-space point of the body.
    pub fn apply_impulse_at_point(&mut self, body: &PhysicsBody, impulse: Vec2, point: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.apply_impulse_at_point(vec2_to_na(impulse), vec2_to_point(point), true);
        }
    }

    /// Get the current linear velocity of a body.
    pub fn velocity(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    #[cfg(test)]
    /// Get the current angular velocity of a body.
    pub fn angular_velocity(&self, body: &PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.angvel())
            .unwrap_or(0.0)
    }

    #[cfg(test)]
    /// Mass of a body, zero if it no longer exists.
    pub fn mass(&self, body: &PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.mass())
            .unwrap_or(0.0)
    }

    /// Get the current position and rotation of a body.
    pub fn body_position(&self, body: &PhysicsBody) -> (Vec2, f32) {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_iso_to_pos_rot(rb.position()))
            .unwrap_or((Vec2::ZERO, 0.0))
    }

    /// Number of rigid bodies in the simulation, not counting the ground.
    pub fn body_count(&self) -> usize {
        self.bodies.len() - 1
    }

    // -- Joint methods --

    /// Tie a body to the static ground. The joint lives until the body is removed.
    pub fn create_ground_joint(&mut self, body: &PhysicsBody, desc: &JointDesc) {
        let joint = match *desc {
            JointDesc::Anchor { anchor, max_force } => GenericJointBuilder::new(JointAxesMask::empty())
                .local_anchor1(vec2_to_point(anchor))
                .local_anchor2(nalgebra::Point2::origin())
                .motor_velocity(JointAxis::LinX, 0.0, MOTOR_FACTOR)
                .motor_velocity(JointAxis::LinY, 0.0, MOTOR_FACTOR)
                .motor_max_force(JointAxis::LinX, max_force)
                .motor_max_force(JointAxis::LinY, max_force)
                .build(),
            JointDesc::AngularDamping { max_force } => GenericJointBuilder::new(JointAxesMask::empty())
                .motor_velocity(JointAxis::AngX, 0.0, MOTOR_FACTOR)
                .motor_max_force(JointAxis::AngX, max_force)
                .build(),
        };
        self.impulse_joints
            .insert(self.ground, body.body_handle, joint, true);
    }

    /// Number of joints in the simulation.
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    // -- private helpers --

    fn collider_party(&self, collider_handle: ColliderHandle) -> Option<ContactParty> {
        let collider = self.colliders.get(collider_handle)?;
        decode_user_data(collider.user_data)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
