use crate::api::types::BallId;
use crate::components::ball::{BallColor, TrackedBall};
use crate::error::{IrlError, Result};

/// The six balls tracked on a standard table, in display order.
pub const DEFAULT_ROSTER: [(&str, BallColor); 6] = [
    ("Yellow", [255, 255, 0]),
    ("Blue", [0, 0, 255]),
    ("Red", [255, 0, 0]),
    ("Purple", [128, 0, 128]),
    ("Orange", [255, 128, 0]),
    ("Green", [0, 255, 0]),
];

/// Fixed, ordered set of tracked balls. A ball's `BallId` is its index.
#[derive(Debug, Clone)]
pub struct Roster {
    balls: Vec<TrackedBall>,
}

impl Roster {
    /// Build a roster from `(name, color)` pairs. Names must be unique.
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, BallColor)>) -> Self {
        let balls = entries
            .into_iter()
            .enumerate()
            .map(|(i, (name, color))| TrackedBall::new(BallId(i as u32), name).with_color(color))
            .collect();
        Self { balls }
    }

    pub fn get(&self, id: BallId) -> Option<&TrackedBall> {
        self.balls.get(id.index())
    }

    pub fn get_mut(&mut self, id: BallId) -> Option<&mut TrackedBall> {
        self.balls.get_mut(id.index())
    }

    /// Find a ball by name.
    pub fn find(&self, name: &str) -> Option<&TrackedBall> {
        self.balls.iter().find(|b| b.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut TrackedBall> {
        self.balls.iter_mut().find(|b| b.name == name)
    }

    /// Resolve a name to its id, or `UnknownBall`.
    pub fn id_of(&self, name: &str) -> Result<BallId> {
        self.find(name)
            .map(|b| b.id)
            .ok_or_else(|| IrlError::UnknownBall(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedBall> {
        self.balls.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedBall> {
        self.balls.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.balls.iter().map(|b| b.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_ROSTER)
    }
}
