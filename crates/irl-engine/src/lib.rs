pub mod api;
pub mod core;
pub mod components;
pub mod vision;
pub mod calibration;
pub mod systems;
pub mod input;
pub mod extensions;
pub mod error;

// Re-export key types at crate root for convenience
pub use api::session::{GameSession, SessionConfig};
pub use api::types::{BallId, SessionEvent, TurnState};
pub use components::ball::{BallBinding, BallColor, BindParams, TrackedBall};
pub use components::color_range::ColorRange;
pub use crate::core::roster::{Roster, DEFAULT_ROSTER};
pub use crate::core::physics::{
    PhysicsWorld, PhysicsBody, BodyDesc, BodyType,
    ColliderDesc, ColliderKind, ColliderMaterial, CollisionPair, ContactParty,
    JointDesc,
};
pub use vision::{Detection, Locator};
pub use calibration::CalibrationStore;
pub use systems::collision::{CollisionHandler, CollisionOutcome, ElasticResolution};
pub use systems::overlay::Overlay;
pub use input::queue::{ControlEvent, ControlQueue};
pub use extensions::{PracticeOverlay, Snapshot};
pub use error::{IrlError, Result};
