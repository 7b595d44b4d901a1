//! Wire DTOs for the runtime's tick payload.
//!
//! The transport delivers the full world state each tick as JSON with
//! camelCase keys. Conversion into [`GameState`] is total: unknown cell
//! codes decode to empty, entities without an id are dropped, and missing
//! fields take their defaults.

use serde::Deserialize;
use zoo_core::{Animal, CellContent, GameState, Position, PowerUpKind, Zookeeper};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PositionDto {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl From<PositionDto> for Position {
    fn from(dto: PositionDto) -> Position {
        Position::new(dto.x, dto.y)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CellDto {
    pub x: i32,
    pub y: i32,
    pub content: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalDto {
    pub id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub position: PositionDto,
    #[serde(default)]
    pub spawn_position: PositionDto,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub captured_counter: i32,
    #[serde(default)]
    pub distance_covered: i32,
    #[serde(default = "default_true")]
    pub is_viable: bool,
    #[serde(default)]
    pub held_power_up: i32,
    #[serde(default)]
    pub active_power_up: i32,
    #[serde(default)]
    pub power_up_duration: i32,
    #[serde(default = "default_streak")]
    pub score_streak: i32,
    #[serde(default)]
    pub ticks_since_last_pellet: i32,
}

fn default_true() -> bool {
    true
}

fn default_streak() -> i32 {
    1
}

impl AnimalDto {
    fn into_animal(self) -> Animal {
        let mut animal = Animal::new(self.id, self.position.into());
        animal.nickname = self.nickname;
        animal.spawn_position = self.spawn_position.into();
        animal.score = self.score.max(0);
        animal.captured_counter = self.captured_counter.max(0);
        animal.distance_covered = self.distance_covered.max(0);
        animal.is_viable = self.is_viable;
        animal.held_power_up = PowerUpKind::from_wire(self.held_power_up);
        animal.active_power_up = PowerUpKind::from_wire(self.active_power_up);
        animal.power_up_duration = self.power_up_duration.max(0);
        animal.score_streak = self.score_streak.clamp(1, 4);
        animal.ticks_since_last_pellet = self.ticks_since_last_pellet.max(0);
        animal
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZookeeperDto {
    pub id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub position: PositionDto,
    #[serde(default)]
    pub spawn_position: PositionDto,
    #[serde(default)]
    pub target_animal_id: String,
    #[serde(default)]
    pub ticks_since_target_update: i32,
}

impl ZookeeperDto {
    fn into_zookeeper(self) -> Zookeeper {
        let mut zk = Zookeeper::new(self.id, self.position.into());
        zk.nickname = self.nickname;
        zk.spawn_position = self.spawn_position.into();
        zk.target_animal_id = self.target_animal_id;
        zk.ticks_since_target_update = self.ticks_since_target_update.max(0);
        zk
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateDto {
    #[serde(default)]
    pub tick: i32,
    pub grid_width: i32,
    pub grid_height: i32,
    #[serde(default)]
    pub remaining_ticks: i32,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub cells: Vec<CellDto>,
    #[serde(default)]
    pub animals: Vec<AnimalDto>,
    #[serde(default)]
    pub zookeepers: Vec<ZookeeperDto>,
}

impl GameStateDto {
    /// Build the simulator state. Entities without an id are dropped, as
    /// the runtime occasionally sends placeholder rows.
    pub fn into_state(self) -> GameState {
        let mut state = GameState::new(self.grid_width, self.grid_height);
        state.tick = self.tick.max(0);
        state.remaining_ticks = self.remaining_ticks.max(0);
        state.game_mode = self.game_mode;

        for cell in self.cells {
            state.set_cell(cell.x, cell.y, CellContent::from_wire(cell.content));
        }
        for animal in self.animals {
            if !animal.id.is_empty() {
                state.animals.push(animal.into_animal());
            }
        }
        for zk in self.zookeepers {
            if !zk.id.is_empty() {
                state.zookeepers.push(zk.into_zookeeper());
            }
        }
        state
    }
}
