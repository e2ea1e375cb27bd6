use std::path::Path;

use glam::Vec2;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::api::types::{BallId, SessionEvent, TurnState};
use crate::components::ball::BindParams;
use crate::components::color_range::ColorRange;
use crate::core::physics::{ColliderMaterial, CollisionPair, PhysicsBody, PhysicsWorld};
use crate::core::roster::Roster;
use crate::error::{IrlError, Result};
use crate::systems::collision::{CollisionHandler, CollisionOutcome, ElasticResolution};
use crate::systems::overlay::Overlay;
use crate::systems::turn;
use crate::vision::locator::Locator;

/// Tunables for a session. Every field falls back to its default when
/// missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Detections with an enclosing radius at or below this are ignored.
    pub min_radius: f32,
    pub ball_mass: f32,
    /// SETUP alignment tolerance in pixels (inclusive).
    pub setup_error: f32,
    /// Simulation step per COMPUTER tick.
    pub physics_dt: f32,
    /// Pause between ticks.
    pub tick_delay_ms: u64,
    /// A bound ball slower than this counts as settled.
    pub settle_speed: f32,
    pub ball_elasticity: f32,
    pub ball_friction: f32,
    pub wall_elasticity: f32,
    pub wall_friction: f32,
    pub wall_thickness: f32,
    /// Positional anchor force limit. Zero disables the anchor.
    pub anchor_max_force: f32,
    /// Rotational damping force limit. Zero disables the damper.
    pub damping_max_force: f32,
    /// Ball that receives the computer's break shot.
    pub break_ball: String,
    pub break_impulse_min: f32,
    pub break_impulse_max: f32,
    /// Where the break impulse lands, relative to the ball centre.
    pub break_point: [f32; 2],
    /// Side of the square morphology kernel.
    pub kernel_size: u32,
    /// Seed for the break shot. Fresh entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_radius: 10.0,
            ball_mass: 10.0,
            setup_error: 70.0,
            physics_dt: 0.01,
            tick_delay_ms: 10,
            settle_speed: 1.0,
            ball_elasticity: 0.7,
            ball_friction: 0.8,
            wall_elasticity: 1.0,
            wall_friction: 1.0,
            wall_thickness: 1.0,
            anchor_max_force: 1000.0,
            damping_max_force: 5.0e7,
            break_ball: "Yellow".to_string(),
            break_impulse_min: 5000.0,
            break_impulse_max: 10000.0,
            break_point: [0.0, 0.0],
            kernel_size: 5,
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| IrlError::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn ball_material(&self) -> ColliderMaterial {
        ColliderMaterial {
            restitution: self.ball_elasticity,
            friction: self.ball_friction,
            mass: self.ball_mass,
        }
    }

    pub fn wall_material(&self) -> ColliderMaterial {
        ColliderMaterial {
            restitution: self.wall_elasticity,
            friction: self.wall_friction,
            mass: 0.0,
        }
    }
}

/// One game on one table: the roster, the physics space and the turn state.
pub struct GameSession {
    pub(crate) config: SessionConfig,
    pub(crate) roster: Roster,
    pub(crate) physics: PhysicsWorld,
    pub(crate) locator: Locator,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) state: TurnState,
    pub(crate) can_end_turn: bool,
    pub(crate) overlays: Vec<Overlay>,
    pub(crate) rng: StdRng,
    events: Vec<SessionEvent>,
    collision_events: Vec<CollisionPair>,
    collision_handler: Box<dyn CollisionHandler>,
    boundary: Vec<PhysicsBody>,
}

impl GameSession {
    /// Start a session in PLAYER for a `width` × `height` video feed.
    pub fn new(config: SessionConfig, roster: Roster, width: u32, height: u32) -> Self {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        physics.set_dt(config.physics_dt);
        let boundary = physics.create_boundary(
            width as f32,
            height as f32,
            config.wall_thickness,
            config.wall_material(),
        );
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        log::info!(
            "Session for {}x{} surface with {} balls",
            width,
            height,
            roster.len()
        );
        Self {
            locator: Locator::new(config.min_radius, config.kernel_size),
            config,
            roster,
            physics,
            width,
            height,
            state: TurnState::Player,
            can_end_turn: true,
            overlays: Vec::new(),
            rng,
            events: Vec::new(),
            collision_events: Vec::new(),
            collision_handler: Box::new(ElasticResolution),
            boundary,
        }
    }

    // -- Accessors --

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Whether the end-turn control should be enabled.
    pub fn can_end_turn(&self) -> bool {
        self.can_end_turn
    }

    /// Overlay commands recorded by the most recent tick.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Edge bodies bounding the playing surface.
    pub fn boundary(&self) -> &[PhysicsBody] {
        &self.boundary
    }

    /// Balls at or above this radius are treated as tracking noise.
    pub fn max_radius(&self) -> f32 {
        self.height as f32 / 2.0
    }

    pub(crate) fn bind_params(&self) -> BindParams {
        BindParams {
            material: self.config.ball_material(),
            anchor_max_force: self.config.anchor_max_force,
            damping_max_force: self.config.damping_max_force,
            max_radius: self.max_radius(),
        }
    }

    /// Replace one ball's colour window. Only valid between turns.
    pub fn set_range(&mut self, name: &str, range: ColorRange) -> Result<()> {
        range.validate(name)?;
        let ball = self
            .roster
            .find_mut(name)
            .ok_or_else(|| IrlError::UnknownBall(name.to_string()))?;
        ball.range = range;
        Ok(())
    }

    /// Install a custom contact hook, replacing plain elastic resolution.
    pub fn set_collision_handler(&mut self, handler: Box<dyn CollisionHandler>) {
        self.collision_handler = handler;
    }

    // -- Turn cycle --

    /// Run one tick against `frame` and return the annotated frame.
    pub fn tick(&mut self, frame: &RgbImage) -> Result<RgbImage> {
        turn::tick(self, frame)
    }

    /// Hand the table to the computer. Ignored (returns `false`) outside PLAYER.
    pub fn end_turn(&mut self) -> bool {
        turn::end_turn(self)
    }

    // -- Events --

    pub fn emit_event(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Drain events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn set_state(&mut self, to: TurnState) {
        let from = self.state;
        if from == to {
            return;
        }
        log::info!("Turn {} -> {}", from, to);
        self.state = to;
        self.emit_event(SessionEvent::StateChanged { from, to });
    }

    pub(crate) fn set_can_end_turn(&mut self, enabled: bool) {
        if self.can_end_turn != enabled {
            self.can_end_turn = enabled;
            self.emit_event(SessionEvent::CanEndTurn(enabled));
        }
    }

    // -- Physics convenience methods --

    /// Release every binding, then bind every ball whose last sighting passes
    /// the sanity bound. Returns the number of balls bound.
    pub fn bind_all(&mut self) -> usize {
        self.release_all();
        let params = self.bind_params();
        let mut bound = 0;
        for ball in self.roster.iter_mut() {
            if ball.bind_to_physics(&mut self.physics, &params) {
                bound += 1;
            }
        }
        bound
    }

    /// Drop every ball's body and joints.
    pub fn release_all(&mut self) {
        for ball in self.roster.iter_mut() {
            ball.unbind(&mut self.physics);
        }
    }

    /// Apply an impulse at `local_point` relative to the ball's simulated
    /// centre. Returns `false` when the ball is not bound.
    pub fn apply_impulse(&mut self, id: BallId, impulse: Vec2, local_point: Vec2) -> bool {
        let Some(binding) = self.roster.get(id).and_then(|b| b.binding) else {
            return false;
        };
        let (center, _) = self.physics.body_position(&binding.body);
        self.physics
            .apply_impulse_at_point(&binding.body, impulse, center + local_point);
        true
    }

    /// Linear velocity of a bound ball, zero when unbound.
    pub fn velocity(&self, id: BallId) -> Vec2 {
        self.roster
            .get(id)
            .and_then(|b| b.binding.as_ref())
            .map(|binding| self.physics.velocity(&binding.body))
            .unwrap_or(Vec2::ZERO)
    }

    /// Simulated centre and radius of a bound ball.
    pub fn simulated(&self, id: BallId) -> Option<(Vec2, f32)> {
        self.roster.get(id)?.simulated(&self.physics)
    }

    /// Collision events from the most recent physics step.
    pub fn collisions(&self) -> &[CollisionPair] {
        &self.collision_events
    }

    /// Advance the simulation one step and run the contact hook on every
    /// contact that began during it.
    pub fn step_physics(&mut self) {
        self.collision_events.clear();
        self.physics.step_into(&mut self.collision_events);

        for pair in self.collision_events.iter().filter(|p| p.started) {
            match self.collision_handler.on_begin(pair) {
                CollisionOutcome::Resolve => {}
                CollisionOutcome::RemoveFromPlay(id) => {
                    if let Some(ball) = self.roster.get_mut(id) {
                        log::info!("{} removed from play", ball.name);
                        ball.unbind(&mut self.physics);
                    }
                }
            }
        }
    }

    /// True when every bound, sanity-valid ball is slower than `settle_speed`.
    pub fn is_settled(&self) -> bool {
        let max_radius = self.max_radius();
        self.roster
            .iter()
            .filter(|b| b.simulated_within(&self.physics, max_radius).is_some())
            .filter_map(|b| b.binding.as_ref())
            .all(|binding| self.physics.velocity(&binding.body).length() < self.config.settle_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::physics::ContactParty;

    fn session() -> GameSession {
        let config = SessionConfig {
            seed: Some(7),
            ..SessionConfig::default()
        };
        GameSession::new(config, Roster::default(), 640, 480)
    }

    fn place(session: &mut GameSession, name: &str, pos: Vec2, radius: f32) -> BallId {
        let ball = session.roster.find_mut(name).unwrap();
        ball.update_detection(pos, radius);
        ball.id
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = SessionConfig::from_json(r#"{ "setup_error": 50.0, "seed": 3 }"#).unwrap();
        assert_eq!(config.setup_error, 50.0);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.min_radius, 10.0);
        assert_eq!(config.break_ball, "Yellow");
        assert_eq!(config.tick_delay_ms, 10);
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let config = SessionConfig {
            settle_speed: 2.5,
            ..SessionConfig::default()
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn new_session_starts_in_player() {
        let s = session();
        assert_eq!(s.state(), TurnState::Player);
        assert!(s.can_end_turn());
        assert_eq!(s.boundary().len(), 4);
        assert_eq!(s.physics().body_count(), 4);
        assert_eq!(s.max_radius(), 240.0);
    }

    #[test]
    fn bind_all_skips_undetected_and_oversized() {
        let mut s = session();
        place(&mut s, "Yellow", Vec2::new(100.0, 100.0), 15.0);
        place(&mut s, "Red", Vec2::new(300.0, 200.0), 15.0);
        place(&mut s, "Blue", Vec2::new(320.0, 240.0), 250.0);

        assert_eq!(s.bind_all(), 2);
        assert_eq!(s.physics().body_count(), 4 + 2);
        assert_eq!(s.physics().joint_count(), 4);

        // Rebinding must not leak.
        assert_eq!(s.bind_all(), 2);
        assert_eq!(s.physics().body_count(), 4 + 2);
        assert_eq!(s.physics().joint_count(), 4);

        s.release_all();
        assert_eq!(s.physics().body_count(), 4);
        assert_eq!(s.physics().joint_count(), 0);
    }

    #[test]
    fn moving_ball_blocks_settle() {
        let mut s = session();
        let yellow = place(&mut s, "Yellow", Vec2::new(100.0, 100.0), 15.0);
        place(&mut s, "Red", Vec2::new(300.0, 200.0), 15.0);
        s.bind_all();
        assert!(s.is_settled());

        assert!(s.apply_impulse(yellow, Vec2::new(5000.0, 0.0), Vec2::ZERO));
        s.step_physics();
        assert!(s.velocity(yellow).length() > 1.0);
        assert!(!s.is_settled());
    }

    #[test]
    fn impulse_on_unbound_ball_is_refused() {
        let mut s = session();
        let id = s.roster.id_of("Green").unwrap();
        assert!(!s.apply_impulse(id, Vec2::new(1.0, 0.0), Vec2::ZERO));
        assert_eq!(s.velocity(id), Vec2::ZERO);
        assert_eq!(s.simulated(id), None);
    }

    #[test]
    fn set_range_validates() {
        let mut s = session();
        let range = ColorRange::new((10, 20), (0, 255), (0, 255));
        s.set_range("Red", range).unwrap();
        assert_eq!(s.roster().find("Red").unwrap().range, range);
        assert!(s.set_range("Cue", range).is_err());
        assert!(s
            .set_range("Red", ColorRange::new((0, 200), (0, 255), (0, 255)))
            .is_err());
    }

    struct Pocket;

    impl CollisionHandler for Pocket {
        fn on_begin(&mut self, pair: &CollisionPair) -> CollisionOutcome {
            match (pair.a, pair.b) {
                (ContactParty::Ball(id), ContactParty::Edge) | (ContactParty::Edge, ContactParty::Ball(id)) => {
                    CollisionOutcome::RemoveFromPlay(id)
                }
                _ => CollisionOutcome::Resolve,
            }
        }
    }

    #[test]
    fn custom_handler_can_remove_ball_from_play() {
        let mut s = session();
        s.set_collision_handler(Box::new(Pocket));
        let yellow = place(&mut s, "Yellow", Vec2::new(600.0, 240.0), 15.0);
        s.config.anchor_max_force = 0.0;
        s.bind_all();
        s.apply_impulse(yellow, Vec2::new(10000.0, 0.0), Vec2::ZERO);

        for _ in 0..100 {
            s.step_physics();
        }
        assert!(!s.roster().get(yellow).unwrap().is_bound());
        assert_eq!(s.physics().body_count(), 4);
    }

    #[test]
    fn events_drain() {
        let mut s = session();
        s.set_can_end_turn(false);
        s.set_can_end_turn(false);
        s.set_state(TurnState::Computer);
        let events = s.drain_events();
        assert_eq!(
            events,
            vec![
                SessionEvent::CanEndTurn(false),
                SessionEvent::StateChanged {
                    from: TurnState::Player,
                    to: TurnState::Computer
                },
            ]
        );
        assert!(s.drain_events().is_empty());
    }
}
