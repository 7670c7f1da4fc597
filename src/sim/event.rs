/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and HUD messages.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped,
    DiamondCollected { remaining: usize },
    ExitOpened,
    PlayerDamaged { health: u32 },
    PlayerTrapped { lives_left: u32 },
    PlayerRespawned,
    LevelCompleted { level: u32 },
    GameOver,
    GameCompleted,
}

impl GameEvent {
    /// Named sound effect for this event, if any.
    pub fn sound_cue(&self) -> Option<&'static str> {
        match self {
            GameEvent::Jumped => Some("jump"),
            GameEvent::DiamondCollected { .. } => Some("diamond_collect"),
            GameEvent::PlayerDamaged { .. } => Some("damage"),
            GameEvent::PlayerTrapped { .. } => Some("death"),
            GameEvent::LevelCompleted { .. } | GameEvent::GameCompleted => Some("level_complete"),
            _ => None,
        }
    }
}
