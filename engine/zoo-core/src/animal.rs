//! The persistent game entities: player animals and their pursuers.

use crate::cell::PowerUpKind;
use crate::position::Position;

/// A player animal as tracked by the simulator.
#[derive(Debug, Clone)]
pub struct Animal {
    pub id: String,
    pub nickname: String,
    pub position: Position,
    pub spawn_position: Position,
    pub score: i32,
    pub captured_counter: i32,
    pub distance_covered: i32,
    pub is_viable: bool,
    /// Power-up picked up but not yet activated.
    pub held_power_up: Option<PowerUpKind>,
    /// Which consumed power-up the running duration belongs to. Cleared
    /// when the duration runs out.
    pub active_power_up: Option<PowerUpKind>,
    /// Ticks remaining on the active power-up; zero when none is active.
    pub power_up_duration: i32,
    /// Pellet value multiplier, clamped to `[1, 4]`.
    pub score_streak: i32,
    /// Pellet-less ticks so far; at 3 the streak drops back to 1.
    pub ticks_since_last_pellet: i32,
    /// Set during simulation when a pursuer lands on this animal.
    pub is_caught: bool,
}

impl Animal {
    /// A fresh animal at its spawn cell.
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            nickname: String::new(),
            position,
            spawn_position: position,
            score: 0,
            captured_counter: 0,
            distance_covered: 0,
            is_viable: true,
            held_power_up: None,
            active_power_up: None,
            power_up_duration: 0,
            score_streak: 1,
            ticks_since_last_pellet: 0,
            is_caught: false,
        }
    }

    /// True while a consumed multiplier juice is still running.
    #[inline]
    pub fn multiplier_active(&self) -> bool {
        self.power_up_duration > 0 && self.active_power_up == Some(PowerUpKind::MultiplierJuice)
    }
}

impl Default for Animal {
    fn default() -> Self {
        Animal::new(String::new(), Position::default())
    }
}

/// A zookeeper chasing the nearest viable animal.
#[derive(Debug, Clone, Default)]
pub struct Zookeeper {
    pub id: String,
    pub nickname: String,
    pub position: Position,
    pub spawn_position: Position,
    /// Empty until the first retarget pass assigns a victim.
    pub target_animal_id: String,
    pub ticks_since_target_update: i32,
}

impl Zookeeper {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            spawn_position: position,
            ..Default::default()
        }
    }
}
