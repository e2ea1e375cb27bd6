use crate::api::types::BallId;
use crate::core::physics::CollisionPair;

/// What the session should do about a contact that just began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// Let the solver resolve the contact normally.
    Resolve,
    /// Take the ball out of the simulation (e.g. it dropped into a pocket).
    RemoveFromPlay(BallId),
}

/// Hook invoked for every contact that starts during a physics step.
pub trait CollisionHandler {
    fn on_begin(&mut self, pair: &CollisionPair) -> CollisionOutcome;
}

/// Plain elastic resolution between every pair of colliders.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticResolution;

impl CollisionHandler for ElasticResolution {
    fn on_begin(&mut self, _pair: &CollisionPair) -> CollisionOutcome {
        CollisionOutcome::Resolve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::physics::ContactParty;

    #[test]
    fn elastic_resolution_always_resolves() {
        let mut handler = ElasticResolution;
        let pairs = [
            CollisionPair {
                a: ContactParty::Ball(BallId(0)),
                b: ContactParty::Ball(BallId(1)),
                started: true,
            },
            CollisionPair {
                a: ContactParty::Ball(BallId(0)),
                b: ContactParty::Edge,
                started: true,
            },
        ];
        for pair in &pairs {
            assert_eq!(handler.on_begin(pair), CollisionOutcome::Resolve);
        }
    }
}
