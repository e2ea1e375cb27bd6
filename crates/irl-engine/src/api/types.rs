/// Unique identifier for a tracked ball. Equal to its index in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BallId(pub u32);

impl BallId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Phase of the player/computer turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Live tracking; the player is taking their shot.
    #[default]
    Player,
    /// The break is being simulated.
    Computer,
    /// The player is re-arranging real balls to match the simulation.
    Setup,
}

impl TurnState {
    pub fn label(self) -> &'static str {
        match self {
            TurnState::Player => "PLAYER",
            TurnState::Computer => "COMPUTER",
            TurnState::Setup => "SETUP",
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Event emitted by the session for the outer surface to consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// The turn state changed.
    StateChanged { from: TurnState, to: TurnState },
    /// The end-turn control became enabled or disabled.
    CanEndTurn(bool),
    /// The break impulse was applied to a ball.
    BreakApplied { ball: BallId, impulse: glam::Vec2 },
}
