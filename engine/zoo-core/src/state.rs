//! The Zooscape forward model.
//!
//! [`GameState`] is the state the search engine clones and rolls forward.
//! [`GameState::apply_action`] advances exactly one tick: the acting animal
//! moves (or uses its held item), cell effects resolve, power-up and streak
//! clocks advance, every zookeeper takes one greedy step, captures resolve,
//! and zookeepers retarget on their 20-tick cadence. The player always moves
//! before the pursuers.
//!
//! Every query treats malformed input as a no-op: an unknown animal id
//! yields an empty action list, an out-of-range cell reads as a wall, an
//! illegal move burns the tick without moving. The one exception is
//! [`GameState::validate`], which reports structurally broken states (bad
//! dimensions, board/grid disagreement) so the service can refuse them up
//! front.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::action::BotAction;
use crate::animal::{Animal, Zookeeper};
use crate::bitboard::BitBoard;
use crate::cell::{CellContent, PowerUpKind};
use crate::position::Position;

/// Tick limit after which a game is over regardless of pellets.
pub const MAX_GAME_TICKS: i32 = 1000;
/// Zookeepers pick a new target every this many ticks.
pub const RETARGET_INTERVAL: i32 = 20;
/// Streak multiplier cap.
pub const MAX_SCORE_STREAK: i32 = 4;
/// Pellet-less ticks before the streak resets.
pub const STREAK_RESET_TICKS: i32 = 3;
/// Power pellets are worth this many plain pellets.
pub const POWER_PELLET_VALUE: i32 = 10;
/// Half-width of the scavenger sweep (11x11 square).
pub const SCAVENGER_RADIUS: i32 = 5;

const CLOAK_DURATION: i32 = 20;
const SCAVENGER_DURATION: i32 = 5;
const MULTIPLIER_DURATION: i32 = 5;
const MULTIPLIER_FACTOR: i32 = 3;
const THREAT_RADIUS: f64 = 10.0;

/// Structural faults the simulator refuses to operate on. Everything softer
/// than this degrades to a no-op instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("non-positive grid dimensions {width}x{height}")]
    BadDimensions { width: i32, height: i32 },

    #[error("grid holds {cells} cells, expected {expected} for {width}x{height}")]
    GridMismatch {
        cells: usize,
        expected: usize,
        width: i32,
        height: i32,
    },

    #[error("{board} board is {board_width}x{board_height}, expected {width}x{height}")]
    BoardMismatch {
        board: &'static str,
        board_width: i32,
        board_height: i32,
        width: i32,
        height: i32,
    },
}

/// Full world state for one tick.
#[derive(Debug, Clone)]
pub struct GameState {
    width: i32,
    height: i32,
    grid: Vec<CellContent>,
    pub tick: i32,
    pub remaining_ticks: i32,
    pub game_mode: String,
    pub pellet_board: BitBoard,
    pub power_up_board: BitBoard,
    pub wall_board: BitBoard,
    pub animals: Vec<Animal>,
    pub zookeepers: Vec<Zookeeper>,
    pub my_animal_id: String,
    /// Cells reached so far during a rollout; seeds the exploration reward.
    pub visited_cells: FxHashSet<Position>,
}

impl GameState {
    /// An empty state of the given size. Non-positive dimensions produce a
    /// zero-cell state that [`GameState::validate`] will reject.
    pub fn new(width: i32, height: i32) -> Self {
        let cells = if width > 0 && height > 0 {
            width as usize * height as usize
        } else {
            0
        };
        Self {
            width: width.max(0),
            height: height.max(0),
            grid: vec![CellContent::Empty; cells],
            tick: 0,
            remaining_ticks: 0,
            game_mode: String::new(),
            pellet_board: BitBoard::new(width, height),
            power_up_board: BitBoard::new(width, height),
            wall_board: BitBoard::new(width, height),
            animals: Vec::new(),
            zookeepers: Vec::new(),
            my_animal_id: String::new(),
            visited_cells: FxHashSet::default(),
        }
    }

    /// Check the structural invariants the search relies on.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(StateError::BadDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize;
        if self.grid.len() != expected {
            return Err(StateError::GridMismatch {
                cells: self.grid.len(),
                expected,
                width: self.width,
                height: self.height,
            });
        }
        for (name, board) in [
            ("wall", &self.wall_board),
            ("pellet", &self.pellet_board),
            ("power-up", &self.power_up_board),
        ] {
            if board.width() != self.width || board.height() != self.height {
                return Err(StateError::BoardMismatch {
                    board: name,
                    board_width: board.width(),
                    board_height: board.height(),
                    width: self.width,
                    height: self.height,
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn is_valid_position(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// A cell is traversable when it is in bounds and not a wall.
    #[inline]
    pub fn is_traversable(&self, x: i32, y: i32) -> bool {
        self.is_valid_position(x, y) && !self.wall_board.get(x, y)
    }

    /// Cell content at `(x, y)`; out-of-range reads as a wall.
    #[inline]
    pub fn cell_at(&self, x: i32, y: i32) -> CellContent {
        if self.is_valid_position(x, y) {
            self.grid[(y * self.width + x) as usize]
        } else {
            CellContent::Wall
        }
    }

    /// Write a cell and keep the bit boards in sync. Out-of-range writes
    /// are ignored.
    pub fn set_cell(&mut self, x: i32, y: i32, content: CellContent) {
        if !self.is_valid_position(x, y) {
            return;
        }
        self.grid[(y * self.width + x) as usize] = content;
        self.pellet_board.set(x, y, content.is_pellet());
        self.power_up_board.set(x, y, content.is_power_up());
        self.wall_board.set(x, y, content == CellContent::Wall);
    }

    pub fn animal(&self, id: &str) -> Option<&Animal> {
        self.animals.iter().find(|a| a.id == id)
    }

    pub fn animal_mut(&mut self, id: &str) -> Option<&mut Animal> {
        self.animals.iter_mut().find(|a| a.id == id)
    }

    pub fn my_animal(&self) -> Option<&Animal> {
        self.animal(&self.my_animal_id)
    }

    /// Directional moves into adjacent non-wall cells, plus `UseItem` when
    /// the animal holds a power-up. An unknown animal yields no actions.
    pub fn legal_actions(&self, animal_id: &str) -> Vec<BotAction> {
        let Some(animal) = self.animal(animal_id) else {
            return Vec::new();
        };
        let pos = animal.position;
        let mut actions = Vec::with_capacity(5);
        for action in BotAction::MOVES {
            let (dx, dy) = action.offset().unwrap_or((0, 0));
            if self.is_traversable(pos.x + dx, pos.y + dy) {
                actions.push(action);
            }
        }
        if animal.held_power_up.is_some() {
            actions.push(BotAction::UseItem);
        }
        actions
    }

    /// Advance one tick: the acting animal first, then every zookeeper.
    /// Unknown ids and illegal moves still consume the tick.
    pub fn apply_action(&mut self, animal_id: &str, action: BotAction) {
        self.tick += 1;
        self.remaining_ticks = (self.remaining_ticks - 1).max(0);

        let Some(idx) = self.animals.iter().position(|a| a.id == animal_id) else {
            self.step_zookeepers();
            return;
        };

        let mut collected = false;
        let mut activated = false;
        match action {
            BotAction::None => {}
            BotAction::UseItem => {
                (activated, collected) = self.use_held_item(idx);
            }
            mv => {
                collected = self.move_animal(idx, mv);
            }
        }

        let animal = &mut self.animals[idx];
        if !activated && animal.power_up_duration > 0 {
            animal.power_up_duration -= 1;
            if animal.power_up_duration == 0 {
                animal.active_power_up = None;
            }
        }

        if collected {
            animal.ticks_since_last_pellet = 0;
        } else {
            animal.ticks_since_last_pellet += 1;
            if animal.ticks_since_last_pellet >= STREAK_RESET_TICKS {
                animal.score_streak = 1;
            }
        }

        self.step_zookeepers();
    }

    /// Activate the held power-up. Returns `(activated, collected)`;
    /// only the scavenger sweep can collect pellets. The countdown skips
    /// the activation tick, so a fresh cloak keeps its full 20 ticks.
    fn use_held_item(&mut self, idx: usize) -> (bool, bool) {
        let Some(kind) = self.animals[idx].held_power_up else {
            return (false, false);
        };
        let mut collected = false;
        match kind {
            PowerUpKind::Cloak => {
                self.animals[idx].power_up_duration = CLOAK_DURATION;
            }
            PowerUpKind::Scavenger => {
                self.animals[idx].power_up_duration = SCAVENGER_DURATION;
                let center = self.animals[idx].position;
                for dy in -SCAVENGER_RADIUS..=SCAVENGER_RADIUS {
                    for dx in -SCAVENGER_RADIUS..=SCAVENGER_RADIUS {
                        let (x, y) = (center.x + dx, center.y + dy);
                        if self.cell_at(x, y) == CellContent::Pellet {
                            self.set_cell(x, y, CellContent::Empty);
                            let animal = &mut self.animals[idx];
                            animal.score += animal.score_streak;
                            collected = true;
                        }
                    }
                }
            }
            PowerUpKind::MultiplierJuice => {
                self.animals[idx].power_up_duration = MULTIPLIER_DURATION;
            }
        }
        let animal = &mut self.animals[idx];
        animal.active_power_up = Some(kind);
        animal.held_power_up = None;
        (true, collected)
    }

    /// Move the animal one cell and resolve what it lands on. Returns
    /// whether a pellet was collected. Blocked moves change nothing.
    fn move_animal(&mut self, idx: usize, action: BotAction) -> bool {
        let Some((dx, dy)) = action.offset() else {
            return false;
        };
        let target = Position::new(
            self.animals[idx].position.x + dx,
            self.animals[idx].position.y + dy,
        );
        if !self.is_traversable(target.x, target.y) {
            return false;
        }

        self.animals[idx].position = target;
        self.animals[idx].distance_covered += 1;
        self.visited_cells.insert(target);

        let mut collected = false;
        match self.cell_at(target.x, target.y) {
            CellContent::Pellet => {
                let animal = &mut self.animals[idx];
                let mut value = animal.score_streak;
                if animal.multiplier_active() {
                    value *= MULTIPLIER_FACTOR;
                }
                animal.score += value;
                animal.score_streak = (animal.score_streak + 1).min(MAX_SCORE_STREAK);
                collected = true;
                self.set_cell(target.x, target.y, CellContent::Empty);
            }
            CellContent::PowerPellet => {
                let animal = &mut self.animals[idx];
                let mut value = POWER_PELLET_VALUE * animal.score_streak;
                if animal.multiplier_active() {
                    value *= MULTIPLIER_FACTOR;
                }
                animal.score += value;
                animal.score_streak = (animal.score_streak + 1).min(MAX_SCORE_STREAK);
                collected = true;
                self.set_cell(target.x, target.y, CellContent::Empty);
            }
            CellContent::PowerUp(kind) => {
                self.animals[idx].held_power_up = Some(kind);
                self.set_cell(target.x, target.y, CellContent::Empty);
            }
            CellContent::Empty | CellContent::Wall => {}
        }
        collected
    }

    /// One greedy step per zookeeper, capture resolution, and the 20-tick
    /// retarget cadence.
    fn step_zookeepers(&mut self) {
        for zi in 0..self.zookeepers.len() {
            let target_id = self.zookeepers[zi].target_animal_id.clone();
            if !target_id.is_empty() {
                if let Some(target_pos) = self.animal(&target_id).map(|a| a.position) {
                    let from = self.zookeepers[zi].position;
                    let next = self.greedy_step(from, target_pos);
                    self.zookeepers[zi].position = next;

                    if let Some(target) = self.animal_mut(&target_id) {
                        if target.position == next && target.power_up_duration == 0 {
                            target.position = target.spawn_position;
                            target.captured_counter += 1;
                            target.score = (target.score as f64 * 0.8).floor() as i32;
                            target.score_streak = 1;
                            target.ticks_since_last_pellet = 0;
                            target.is_caught = true;
                        }
                    }
                }
            }

            self.zookeepers[zi].ticks_since_target_update += 1;
            if self.zookeepers[zi].ticks_since_target_update >= RETARGET_INTERVAL {
                self.zookeepers[zi].ticks_since_target_update = 0;
                let from = self.zookeepers[zi].position;
                let nearest = self
                    .animals
                    .iter()
                    .filter(|a| a.is_viable && a.position != a.spawn_position)
                    .min_by_key(|a| from.manhattan_distance(a.position))
                    .map(|a| a.id.clone())
                    .unwrap_or_default();
                self.zookeepers[zi].target_animal_id = nearest;
            }
        }
    }

    /// One Manhattan-greedy step from `from` towards `target`, x-axis
    /// first, falling through to the y-axis when the x move is blocked.
    fn greedy_step(&self, from: Position, target: Position) -> Position {
        let mut next = from;
        if target.x > from.x && self.is_traversable(from.x + 1, from.y) {
            next.x += 1;
        } else if target.x < from.x && self.is_traversable(from.x - 1, from.y) {
            next.x -= 1;
        } else if target.y > from.y && self.is_traversable(from.x, from.y + 1) {
            next.y += 1;
        } else if target.y < from.y && self.is_traversable(from.x, from.y - 1) {
            next.y -= 1;
        }
        next
    }

    /// Where a zookeeper will be after `ticks_ahead` greedy steps against
    /// its target's current position.
    pub fn predict_zookeeper_position(&self, zk: &Zookeeper, ticks_ahead: i32) -> Position {
        if zk.target_animal_id.is_empty() {
            return zk.position;
        }
        let Some(target_pos) = self.animal(&zk.target_animal_id).map(|a| a.position) else {
            return zk.position;
        };
        let mut predicted = zk.position;
        for _ in 0..ticks_ahead {
            predicted = self.greedy_step(predicted, target_pos);
        }
        predicted
    }

    /// `max(0, 10 - distance)` to the closest zookeeper; 0 with none.
    pub fn zookeeper_threat(&self, pos: Position) -> f64 {
        self.zookeepers
            .iter()
            .map(|zk| (THREAT_RADIUS - pos.manhattan_distance(zk.position) as f64).max(0.0))
            .fold(0.0, f64::max)
    }

    pub fn is_player_caught(&self, animal_id: &str) -> bool {
        self.animal(animal_id).is_some_and(|a| a.is_caught)
    }

    /// Game over: the own animal is caught, no pellets remain, or the tick
    /// limit is reached.
    pub fn is_terminal(&self) -> bool {
        if self.my_animal().is_some_and(|a| a.is_caught) {
            return true;
        }
        self.pellet_board.popcount() == 0 || self.tick >= MAX_GAME_TICKS
    }

    /// Manhattan distance from `pos` to the nearest pellet, `-1` when none
    /// remain.
    pub fn distance_to_nearest_pellet(&self, pos: Position) -> i32 {
        self.pellet_board
            .ones()
            .map(|p| pos.manhattan_distance(p))
            .min()
            .unwrap_or(-1)
    }

    /// Pellet cells inside the square of the given radius around `pos`.
    pub fn nearby_pellets(&self, pos: Position, radius: i32) -> Vec<Position> {
        self.cells_in_square(pos, radius, |c| c.is_pellet())
    }

    /// Power-up cells inside the square of the given radius around `pos`.
    pub fn nearby_power_ups(&self, pos: Position, radius: i32) -> Vec<Position> {
        self.cells_in_square(pos, radius, |c| c.is_power_up())
    }

    fn cells_in_square(
        &self,
        center: Position,
        radius: i32,
        keep: impl Fn(CellContent) -> bool,
    ) -> Vec<Position> {
        let mut found = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (x, y) = (center.x + dx, center.y + dy);
                if self.is_valid_position(x, y) && keep(self.cell_at(x, y)) {
                    found.push(Position::new(x, y));
                }
            }
        }
        found
    }

    /// Fraction of in-bounds cells around `center` holding a pellet.
    pub fn pellet_density(&self, center: Position, radius: i32) -> f64 {
        let mut pellets = 0;
        let mut total = 0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (x, y) = (center.x + dx, center.y + dy);
                if self.is_valid_position(x, y) {
                    total += 1;
                    if self.cell_at(x, y).is_pellet() {
                        pellets += 1;
                    }
                }
            }
        }
        if total > 0 {
            pellets as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Count of pellet cells inside the square of the given radius.
    pub fn count_pellets_in_area(&self, center: Position, radius: i32) -> i32 {
        let mut count = 0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if self.cell_at(center.x + dx, center.y + dy).is_pellet() {
                    count += 1;
                }
            }
        }
        count
    }

    /// 64-bit digest over tick, animal positions and scores, and zookeeper
    /// positions. Keys the transposition table; not cryptographic.
    pub fn digest(&self) -> u64 {
        let mut hash = 0u64;
        mix(&mut hash, self.tick as u64);
        for animal in &self.animals {
            mix(&mut hash, animal.position.x as u64);
            mix(&mut hash, animal.position.y as u64);
            mix(&mut hash, animal.score as u64);
        }
        for zk in &self.zookeepers {
            mix(&mut hash, zk.position.x as u64);
            mix(&mut hash, zk.position.y as u64);
        }
        hash
    }

    /// Like [`GameState::digest`] but without the tick, so two states that
    /// differ only in elapsed time collide. Rollouts key their cycle set
    /// on this: with the tick mixed in, no revisit would ever repeat.
    pub fn positional_digest(&self) -> u64 {
        let mut hash = 0u64;
        for animal in &self.animals {
            mix(&mut hash, animal.position.x as u64);
            mix(&mut hash, animal.position.y as u64);
            mix(&mut hash, animal.score as u64);
        }
        for zk in &self.zookeepers {
            mix(&mut hash, zk.position.x as u64);
            mix(&mut hash, zk.position.y as u64);
        }
        hash
    }
}

#[inline]
fn mix(hash: &mut u64, value: u64) {
    *hash ^= value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(*hash << 6)
        .wrapping_add(*hash >> 2);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A width x height state with perimeter walls and one animal at `pos`.
    fn walled_state(width: i32, height: i32, pos: Position) -> GameState {
        let mut state = GameState::new(width, height);
        for x in 0..width {
            state.set_cell(x, 0, CellContent::Wall);
            state.set_cell(x, height - 1, CellContent::Wall);
        }
        for y in 0..height {
            state.set_cell(0, y, CellContent::Wall);
            state.set_cell(width - 1, y, CellContent::Wall);
        }
        state.animals.push(Animal::new("a1", pos));
        state.my_animal_id = "a1".to_string();
        state
    }

    #[test]
    fn test_set_cell_keeps_boards_in_sync() {
        let mut state = GameState::new(8, 8);
        state.set_cell(2, 3, CellContent::Pellet);
        state.set_cell(4, 4, CellContent::PowerPellet);
        state.set_cell(1, 1, CellContent::Wall);
        state.set_cell(5, 5, CellContent::PowerUp(PowerUpKind::Scavenger));

        assert!(state.pellet_board.get(2, 3));
        assert!(state.pellet_board.get(4, 4));
        assert!(state.wall_board.get(1, 1));
        assert!(state.power_up_board.get(5, 5));
        assert!(!state.pellet_board.get(5, 5));

        state.set_cell(2, 3, CellContent::Empty);
        assert!(!state.pellet_board.get(2, 3));
    }

    #[test]
    fn test_validate_rejects_bad_dimensions() {
        let state = GameState::new(0, 5);
        assert!(matches!(
            state.validate(),
            Err(StateError::BadDimensions { .. })
        ));
        assert!(GameState::new(7, 7).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_board_mismatch() {
        let mut state = GameState::new(7, 7);
        state.pellet_board = BitBoard::new(5, 5);
        assert!(matches!(
            state.validate(),
            Err(StateError::BoardMismatch { board: "pellet", .. })
        ));
    }

    #[test]
    fn test_legal_actions_exclude_walls() {
        let state = walled_state(5, 5, Position::new(1, 1));
        let actions = state.legal_actions("a1");
        assert_eq!(actions, vec![BotAction::Down, BotAction::Right]);
    }

    #[test]
    fn test_legal_actions_include_use_item_when_holding() {
        let mut state = walled_state(5, 5, Position::new(2, 2));
        state.animal_mut("a1").unwrap().held_power_up = Some(PowerUpKind::Cloak);
        assert!(state.legal_actions("a1").contains(&BotAction::UseItem));
    }

    #[test]
    fn test_legal_actions_unknown_animal_is_empty() {
        let state = walled_state(5, 5, Position::new(2, 2));
        assert!(state.legal_actions("ghost").is_empty());
    }

    #[test]
    fn test_blocked_move_consumes_tick_without_moving() {
        let mut state = walled_state(5, 5, Position::new(1, 1));
        state.apply_action("a1", BotAction::Up);
        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.position, Position::new(1, 1));
        assert_eq!(animal.distance_covered, 0);
        assert_eq!(state.tick, 1);
    }

    #[test]
    fn test_pellet_collection_updates_score_and_streak() {
        let mut state = walled_state(6, 6, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::Pellet);
        let before = state.pellet_board.popcount();

        state.apply_action("a1", BotAction::Right);

        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.score, 1);
        assert_eq!(animal.score_streak, 2);
        assert_eq!(animal.ticks_since_last_pellet, 0);
        assert_eq!(state.pellet_board.popcount(), before - 1);
        assert_eq!(state.cell_at(2, 1), CellContent::Empty);
    }

    #[test]
    fn test_power_pellet_is_worth_ten_times_streak() {
        let mut state = walled_state(6, 6, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::PowerPellet);
        state.animal_mut("a1").unwrap().score_streak = 3;

        state.apply_action("a1", BotAction::Right);

        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.score, 30);
        assert_eq!(animal.score_streak, 4);
    }

    #[test]
    fn test_streak_caps_at_four() {
        let mut state = walled_state(10, 4, Position::new(1, 1));
        for x in 2..8 {
            state.set_cell(x, 1, CellContent::Pellet);
        }
        for _ in 0..6 {
            state.apply_action("a1", BotAction::Right);
        }
        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.score_streak, 4);
        // 1 + 2 + 3 + 4 + 4 + 4
        assert_eq!(animal.score, 18);
    }

    #[test]
    fn test_streak_resets_after_three_pellet_less_ticks() {
        let mut state = walled_state(10, 6, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::Pellet);
        state.apply_action("a1", BotAction::Right);
        assert_eq!(state.animal("a1").unwrap().score_streak, 2);

        state.apply_action("a1", BotAction::Right);
        state.apply_action("a1", BotAction::Right);
        assert_eq!(state.animal("a1").unwrap().score_streak, 2);

        state.apply_action("a1", BotAction::Right);
        assert_eq!(state.animal("a1").unwrap().score_streak, 1);
    }

    #[test]
    fn test_power_up_pickup_and_cloak_use() {
        let mut state = walled_state(6, 6, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::PowerUp(PowerUpKind::Cloak));

        state.apply_action("a1", BotAction::Right);
        assert_eq!(
            state.animal("a1").unwrap().held_power_up,
            Some(PowerUpKind::Cloak)
        );
        assert!(!state.power_up_board.get(2, 1));

        state.apply_action("a1", BotAction::UseItem);
        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.held_power_up, None);
        assert_eq!(animal.active_power_up, Some(PowerUpKind::Cloak));
        assert_eq!(animal.power_up_duration, 20);

        // The countdown starts on the next tick.
        state.apply_action("a1", BotAction::Left);
        assert_eq!(state.animal("a1").unwrap().power_up_duration, 19);
    }

    #[test]
    fn test_scavenger_sweeps_plain_pellets_only() {
        let mut state = walled_state(13, 13, Position::new(6, 6));
        state.set_cell(2, 2, CellContent::Pellet);
        state.set_cell(10, 10, CellContent::Pellet);
        state.set_cell(6, 3, CellContent::PowerPellet);
        state.animal_mut("a1").unwrap().held_power_up = Some(PowerUpKind::Scavenger);

        state.apply_action("a1", BotAction::UseItem);

        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.score, 2);
        assert_eq!(animal.ticks_since_last_pellet, 0);
        assert_eq!(animal.power_up_duration, 5);
        assert_eq!(state.cell_at(2, 2), CellContent::Empty);
        assert_eq!(state.cell_at(10, 10), CellContent::Empty);
        // Power pellets stay put.
        assert_eq!(state.cell_at(6, 3), CellContent::PowerPellet);
    }

    #[test]
    fn test_multiplier_triples_pellet_value() {
        let mut state = walled_state(8, 8, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::Pellet);
        {
            let animal = state.animal_mut("a1").unwrap();
            animal.held_power_up = Some(PowerUpKind::MultiplierJuice);
            animal.score_streak = 2;
        }

        state.apply_action("a1", BotAction::UseItem);
        state.apply_action("a1", BotAction::Right);

        let animal = state.animal("a1").unwrap();
        // 2 (streak) x 3 (multiplier)
        assert_eq!(animal.score, 6);
    }

    #[test]
    fn test_use_item_without_power_up_is_a_no_op() {
        let mut state = walled_state(5, 5, Position::new(2, 2));
        state.apply_action("a1", BotAction::UseItem);
        let animal = state.animal("a1").unwrap();
        assert_eq!(animal.power_up_duration, 0);
        assert_eq!(state.tick, 1);
    }

    #[test]
    fn test_zookeeper_steps_x_axis_first() {
        let mut state = walled_state(10, 10, Position::new(7, 7));
        let mut zk = Zookeeper::new("zk1", Position::new(2, 2));
        zk.target_animal_id = "a1".to_string();
        state.zookeepers.push(zk);

        state.apply_action("a1", BotAction::None);
        assert_eq!(state.zookeepers[0].position, Position::new(3, 2));
    }

    #[test]
    fn test_zookeeper_falls_back_to_y_axis_when_blocked() {
        let mut state = walled_state(10, 10, Position::new(7, 7));
        state.set_cell(3, 2, CellContent::Wall);
        let mut zk = Zookeeper::new("zk1", Position::new(2, 2));
        zk.target_animal_id = "a1".to_string();
        state.zookeepers.push(zk);

        state.apply_action("a1", BotAction::None);
        assert_eq!(state.zookeepers[0].position, Position::new(2, 3));
    }

    #[test]
    fn test_capture_teleports_and_penalizes() {
        let mut state = walled_state(10, 10, Position::new(4, 4));
        {
            let animal = state.animal_mut("a1").unwrap();
            animal.spawn_position = Position::new(1, 1);
            animal.score = 100;
            animal.score_streak = 4;
        }
        let mut zk = Zookeeper::new("zk1", Position::new(4, 4));
        zk.target_animal_id = "a1".to_string();
        state.zookeepers.push(zk);

        state.apply_action("a1", BotAction::None);

        let animal = state.animal("a1").unwrap();
        assert!(animal.is_caught);
        assert_eq!(animal.position, Position::new(1, 1));
        assert_eq!(animal.score, 80);
        assert_eq!(animal.score_streak, 1);
        assert_eq!(animal.captured_counter, 1);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_cloak_prevents_capture() {
        let mut state = walled_state(10, 10, Position::new(4, 4));
        {
            let animal = state.animal_mut("a1").unwrap();
            animal.spawn_position = Position::new(1, 1);
            animal.active_power_up = Some(PowerUpKind::Cloak);
            animal.power_up_duration = 10;
        }
        let mut zk = Zookeeper::new("zk1", Position::new(4, 4));
        zk.target_animal_id = "a1".to_string();
        state.zookeepers.push(zk);

        state.apply_action("a1", BotAction::None);

        let animal = state.animal("a1").unwrap();
        assert!(!animal.is_caught);
        assert_eq!(animal.position, Position::new(4, 4));
    }

    #[test]
    fn test_retarget_picks_nearest_off_spawn_animal() {
        let mut state = walled_state(12, 12, Position::new(2, 2));
        state.animal_mut("a1").unwrap().spawn_position = Position::new(10, 10);
        let mut far = Animal::new("a2", Position::new(9, 9));
        far.spawn_position = Position::new(1, 1);
        state.animals.push(far);

        let mut zk = Zookeeper::new("zk1", Position::new(3, 3));
        zk.ticks_since_target_update = RETARGET_INTERVAL - 1;
        state.zookeepers.push(zk);

        state.apply_action("a1", BotAction::None);
        assert_eq!(state.zookeepers[0].target_animal_id, "a1");
        assert_eq!(state.zookeepers[0].ticks_since_target_update, 0);
    }

    #[test]
    fn test_retarget_skips_animals_on_spawn() {
        let mut state = walled_state(12, 12, Position::new(2, 2));
        // a1 sits on its spawn, a2 does not.
        let mut roaming = Animal::new("a2", Position::new(9, 9));
        roaming.spawn_position = Position::new(1, 1);
        state.animals.push(roaming);

        let mut zk = Zookeeper::new("zk1", Position::new(3, 3));
        zk.ticks_since_target_update = RETARGET_INTERVAL - 1;
        state.zookeepers.push(zk);

        state.apply_action("a1", BotAction::None);
        assert_eq!(state.zookeepers[0].target_animal_id, "a2");
    }

    #[test]
    fn test_predict_zookeeper_position() {
        let mut state = walled_state(12, 12, Position::new(8, 3));
        let mut zk = Zookeeper::new("zk1", Position::new(2, 3));
        zk.target_animal_id = "a1".to_string();
        state.zookeepers.push(zk);

        let predicted = state.predict_zookeeper_position(&state.zookeepers[0], 3);
        assert_eq!(predicted, Position::new(5, 3));

        let untargeted = Zookeeper::new("zk2", Position::new(2, 3));
        assert_eq!(
            state.predict_zookeeper_position(&untargeted, 5),
            Position::new(2, 3)
        );
    }

    #[test]
    fn test_zookeeper_threat() {
        let mut state = walled_state(20, 20, Position::new(1, 1));
        assert_eq!(state.zookeeper_threat(Position::new(5, 5)), 0.0);

        state.zookeepers.push(Zookeeper::new("zk1", Position::new(8, 5)));
        assert_eq!(state.zookeeper_threat(Position::new(5, 5)), 7.0);
        assert_eq!(state.zookeeper_threat(Position::new(18, 18)), 0.0);
    }

    #[test]
    fn test_distance_to_nearest_pellet() {
        let mut state = walled_state(10, 10, Position::new(1, 1));
        assert_eq!(state.distance_to_nearest_pellet(Position::new(1, 1)), -1);

        state.set_cell(4, 4, CellContent::Pellet);
        state.set_cell(8, 8, CellContent::Pellet);
        assert_eq!(state.distance_to_nearest_pellet(Position::new(1, 1)), 6);
    }

    #[test]
    fn test_density_and_area_queries() {
        let mut state = GameState::new(10, 10);
        state.set_cell(5, 5, CellContent::Pellet);
        state.set_cell(5, 6, CellContent::Pellet);
        state.set_cell(9, 9, CellContent::Pellet);

        assert_eq!(state.count_pellets_in_area(Position::new(5, 5), 2), 2);
        let density = state.pellet_density(Position::new(5, 5), 2);
        assert!((density - 2.0 / 25.0).abs() < 1e-9);
        assert_eq!(state.nearby_pellets(Position::new(5, 5), 2).len(), 2);
    }

    #[test]
    fn test_clone_independence() {
        let mut state = walled_state(6, 6, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::Pellet);

        let mut cloned = state.clone();
        cloned.apply_action("a1", BotAction::Right);

        // The original is untouched.
        assert_eq!(state.tick, 0);
        assert_eq!(state.animal("a1").unwrap().position, Position::new(1, 1));
        assert!(state.pellet_board.get(2, 1));

        // And the clone evolved exactly like a direct application would.
        let mut direct = walled_state(6, 6, Position::new(1, 1));
        direct.set_cell(2, 1, CellContent::Pellet);
        direct.apply_action("a1", BotAction::Right);
        assert_eq!(
            cloned.animal("a1").unwrap().score,
            direct.animal("a1").unwrap().score
        );
        assert_eq!(cloned.digest(), direct.digest());
    }

    #[test]
    fn test_digest_tracks_positions_and_scores() {
        let mut state = walled_state(8, 8, Position::new(1, 1));
        let base = state.digest();

        let mut moved = state.clone();
        moved.animal_mut("a1").unwrap().position = Position::new(2, 1);
        assert_ne!(moved.digest(), base);

        state.animal_mut("a1").unwrap().score += 1;
        assert_ne!(state.digest(), base);
    }

    #[test]
    fn test_positional_digest_ignores_tick() {
        let mut state = walled_state(8, 8, Position::new(1, 1));
        let digest = state.digest();
        let positional = state.positional_digest();

        state.tick += 5;
        assert_ne!(state.digest(), digest);
        assert_eq!(state.positional_digest(), positional);

        state.animal_mut("a1").unwrap().position = Position::new(2, 1);
        assert_ne!(state.positional_digest(), positional);
    }

    #[test]
    fn test_terminal_conditions() {
        let mut state = walled_state(6, 6, Position::new(1, 1));
        // No pellets on the board.
        assert!(state.is_terminal());

        state.set_cell(3, 3, CellContent::Pellet);
        assert!(!state.is_terminal());

        state.tick = MAX_GAME_TICKS;
        assert!(state.is_terminal());
    }

    #[test]
    fn test_apply_action_for_unknown_animal_still_ticks() {
        let mut state = walled_state(6, 6, Position::new(1, 1));
        state.apply_action("ghost", BotAction::Up);
        assert_eq!(state.tick, 1);
    }

    #[test]
    fn test_visited_cells_accumulate() {
        let mut state = walled_state(8, 8, Position::new(1, 1));
        state.apply_action("a1", BotAction::Right);
        state.apply_action("a1", BotAction::Right);
        state.apply_action("a1", BotAction::Left);
        assert!(state.visited_cells.contains(&Position::new(2, 1)));
        assert!(state.visited_cells.contains(&Position::new(3, 1)));
        assert_eq!(state.visited_cells.len(), 2);
    }
}
