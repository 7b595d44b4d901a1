//! The individual heuristic kinds.
//!
//! Each variant carries its own weight and tuning parameters. Scores are
//! already weight-multiplied; the engine just sums them.

use zoo_core::{BotAction, CellContent, GameState, Position, PowerUpKind};

/// Sentinel for moves into invalid cells. Large enough to lose every
/// comparison, finite so sums stay well-behaved.
pub const INVALID_MOVE_SCORE: f64 = -1000.0;

/// One weighted evaluator of `(state, animal, action)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Heuristic {
    /// Inverse distance to the nearest pellet within radius 10.
    PelletDistance { weight: f64 },
    /// Fraction of pellet cells in a radius-5 box.
    PelletDensity { weight: f64, radius: i32 },
    /// Pellet-collection bonus, urgent when the streak is about to reset.
    ScoreStreak { weight: f64 },
    /// Pellets in a straight line from the post-move cell.
    ConsecutivePellet { weight: f64, max_lookahead: i32 },
    /// Penalty inside the danger radius, small bonus at safe distance.
    ZookeeperAvoidance { weight: f64, danger_radius: i32 },
    /// Penalty over predicted pursuer positions for the coming ticks.
    ZookeeperPrediction { weight: f64, prediction_steps: i32 },
    /// Reward for stepping onto (or near) power-up cells.
    PowerUpCollection { weight: f64 },
    /// Reward for `UseItem` scaled by how useful the held kind is now.
    PowerUpUsage { weight: f64 },
    /// Prefer a moderate distance from the board centre.
    CenterControl { weight: f64 },
    /// Prefer cells with more escape routes.
    WallAvoidance { weight: f64 },
    /// Reward continuing straight, penalize reversing.
    MovementConsistency { weight: f64 },
    /// Area-control value of the surrounding cells.
    TerritoryControl { weight: f64, radius: i32 },
    /// Reward cutting opponents off from the pellets near them.
    OpponentBlocking { weight: f64 },
    /// Late-game pellet urgency once the board is mostly cleared.
    Endgame { weight: f64, threshold: f64 },
}

impl Heuristic {
    /// The full set with its default weights (the balanced preset).
    pub fn defaults() -> Vec<Heuristic> {
        vec![
            Heuristic::PelletDistance { weight: 2.0 },
            Heuristic::PelletDensity {
                weight: 1.5,
                radius: 5,
            },
            Heuristic::ScoreStreak { weight: 1.8 },
            Heuristic::ConsecutivePellet {
                weight: 2.2,
                max_lookahead: 5,
            },
            Heuristic::ZookeeperAvoidance {
                weight: 5.0,
                danger_radius: 8,
            },
            Heuristic::ZookeeperPrediction {
                weight: 3.5,
                prediction_steps: 5,
            },
            Heuristic::PowerUpCollection { weight: 2.5 },
            Heuristic::PowerUpUsage { weight: 3.0 },
            Heuristic::CenterControl { weight: 0.8 },
            Heuristic::WallAvoidance { weight: 1.2 },
            Heuristic::MovementConsistency { weight: 0.6 },
            Heuristic::TerritoryControl {
                weight: 1.4,
                radius: 6,
            },
            Heuristic::OpponentBlocking { weight: 1.0 },
            Heuristic::Endgame {
                weight: 2.0,
                threshold: 0.3,
            },
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::PelletDistance { .. } => "PelletDistance",
            Heuristic::PelletDensity { .. } => "PelletDensity",
            Heuristic::ScoreStreak { .. } => "ScoreStreak",
            Heuristic::ConsecutivePellet { .. } => "ConsecutivePellet",
            Heuristic::ZookeeperAvoidance { .. } => "ZookeeperAvoidance",
            Heuristic::ZookeeperPrediction { .. } => "ZookeeperPrediction",
            Heuristic::PowerUpCollection { .. } => "PowerUpCollection",
            Heuristic::PowerUpUsage { .. } => "PowerUpUsage",
            Heuristic::CenterControl { .. } => "CenterControl",
            Heuristic::WallAvoidance { .. } => "WallAvoidance",
            Heuristic::MovementConsistency { .. } => "MovementConsistency",
            Heuristic::TerritoryControl { .. } => "TerritoryControl",
            Heuristic::OpponentBlocking { .. } => "OpponentBlocking",
            Heuristic::Endgame { .. } => "Endgame",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Heuristic::PelletDistance { weight }
            | Heuristic::PelletDensity { weight, .. }
            | Heuristic::ScoreStreak { weight }
            | Heuristic::ConsecutivePellet { weight, .. }
            | Heuristic::ZookeeperAvoidance { weight, .. }
            | Heuristic::ZookeeperPrediction { weight, .. }
            | Heuristic::PowerUpCollection { weight }
            | Heuristic::PowerUpUsage { weight }
            | Heuristic::CenterControl { weight }
            | Heuristic::WallAvoidance { weight }
            | Heuristic::MovementConsistency { weight }
            | Heuristic::TerritoryControl { weight, .. }
            | Heuristic::OpponentBlocking { weight }
            | Heuristic::Endgame { weight, .. } => *weight,
        }
    }

    pub fn set_weight(&mut self, new_weight: f64) {
        match self {
            Heuristic::PelletDistance { weight }
            | Heuristic::PelletDensity { weight, .. }
            | Heuristic::ScoreStreak { weight }
            | Heuristic::ConsecutivePellet { weight, .. }
            | Heuristic::ZookeeperAvoidance { weight, .. }
            | Heuristic::ZookeeperPrediction { weight, .. }
            | Heuristic::PowerUpCollection { weight }
            | Heuristic::PowerUpUsage { weight }
            | Heuristic::CenterControl { weight }
            | Heuristic::WallAvoidance { weight }
            | Heuristic::MovementConsistency { weight }
            | Heuristic::TerritoryControl { weight, .. }
            | Heuristic::OpponentBlocking { weight }
            | Heuristic::Endgame { weight, .. } => *weight = new_weight,
        }
    }

    /// Score one action. `last_action` is the previously chosen action for
    /// this animal, when the caller tracked one.
    pub fn evaluate(
        &self,
        state: &GameState,
        animal_id: &str,
        action: BotAction,
        last_action: Option<BotAction>,
    ) -> f64 {
        let Some(animal) = state.animal(animal_id) else {
            return 0.0;
        };

        match *self {
            Heuristic::PelletDistance { weight } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let nearest = state
                    .nearby_pellets(pos, 10)
                    .iter()
                    .map(|p| pos.manhattan_distance(*p))
                    .min();
                match nearest {
                    Some(d) => weight * (20.0 - d as f64) / 20.0,
                    None => 0.0,
                }
            }

            Heuristic::PelletDensity { weight, radius } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                weight * state.pellet_density(pos, radius) * 100.0
            }

            Heuristic::ScoreStreak { weight } => {
                if action == BotAction::UseItem {
                    return match animal.held_power_up {
                        Some(PowerUpKind::Scavenger) => weight * 50.0,
                        Some(_) => weight * 10.0,
                        None => 0.0,
                    };
                }
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                if state.cell_at(pos.x, pos.y).is_pellet() {
                    let mut bonus = animal.score_streak as f64 * 10.0;
                    if animal.ticks_since_last_pellet >= 2 {
                        bonus += 30.0;
                    }
                    weight * bonus
                } else if animal.ticks_since_last_pellet >= 2 {
                    weight * -20.0
                } else {
                    0.0
                }
            }

            Heuristic::ConsecutivePellet {
                weight,
                max_lookahead,
            } => {
                let Some((dx, dy)) = action.offset() else {
                    return 0.0;
                };
                let start = Position::new(animal.position.x + dx, animal.position.y + dy);
                if !state.is_traversable(start.x, start.y) {
                    return 0.0;
                }
                let mut consecutive = 0;
                let mut cur = start;
                for _ in 0..max_lookahead {
                    if !state.is_traversable(cur.x, cur.y)
                        || !state.cell_at(cur.x, cur.y).is_pellet()
                    {
                        break;
                    }
                    consecutive += 1;
                    cur = Position::new(cur.x + dx, cur.y + dy);
                }
                weight * consecutive as f64
            }

            Heuristic::ZookeeperAvoidance {
                weight,
                danger_radius,
            } => {
                if action == BotAction::UseItem {
                    return if animal.held_power_up == Some(PowerUpKind::Cloak) {
                        weight * state.zookeeper_threat(animal.position) * 20.0
                    } else {
                        0.0
                    };
                }
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let nearest = state
                    .zookeepers
                    .iter()
                    .map(|zk| pos.manhattan_distance(zk.position))
                    .min();
                match nearest {
                    Some(d) if d < danger_radius => {
                        weight * -((danger_radius - d) as f64 * 20.0)
                    }
                    Some(d) => weight * (d as f64).min(10.0),
                    None => weight * 10.0,
                }
            }

            Heuristic::ZookeeperPrediction {
                weight,
                prediction_steps,
            } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let mut total_threat = 0.0;
                for zk in &state.zookeepers {
                    for step in 1..=prediction_steps {
                        let predicted = state.predict_zookeeper_position(zk, step);
                        let d = pos.manhattan_distance(predicted);
                        if d < 3 {
                            total_threat +=
                                (3 - d) as f64 * (prediction_steps - step + 1) as f64 * 10.0;
                        }
                    }
                }
                weight * -total_threat
            }

            Heuristic::PowerUpCollection { weight } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let value = match state.cell_at(pos.x, pos.y) {
                    CellContent::PowerUp(PowerUpKind::Cloak) => 40.0,
                    CellContent::PowerUp(PowerUpKind::Scavenger) => 60.0,
                    CellContent::PowerUp(PowerUpKind::MultiplierJuice) => 50.0,
                    _ => {
                        let nearest = state
                            .nearby_power_ups(pos, 5)
                            .iter()
                            .map(|p| pos.manhattan_distance(*p))
                            .min();
                        match nearest {
                            Some(d) => (5 - d) as f64 * 5.0,
                            None => 0.0,
                        }
                    }
                };
                weight * value
            }

            Heuristic::PowerUpUsage { weight } => {
                if action != BotAction::UseItem {
                    return 0.0;
                }
                let value = match animal.held_power_up {
                    Some(PowerUpKind::Cloak) => state.zookeeper_threat(animal.position) * 30.0,
                    Some(PowerUpKind::Scavenger) => {
                        state.count_pellets_in_area(animal.position, 5) as f64 * 15.0
                    }
                    Some(PowerUpKind::MultiplierJuice) => {
                        state.count_pellets_in_area(animal.position, 3) as f64
                            * animal.score_streak as f64
                            * 8.0
                    }
                    None => 0.0,
                };
                weight * value
            }

            Heuristic::CenterControl { weight } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let center = Position::new(state.width() / 2, state.height() / 2);
                let max_distance = (state.width() + state.height()) as f64;
                let optimal = max_distance * 0.3;
                let deviation = (pos.manhattan_distance(center) as f64 - optimal).abs();
                weight * (max_distance - deviation) / max_distance * 10.0
            }

            Heuristic::WallAvoidance { weight } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let mut escape_routes = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if (dx, dy) != (0, 0) && state.is_traversable(pos.x + dx, pos.y + dy) {
                            escape_routes += 1;
                        }
                    }
                }
                weight * escape_routes as f64 * 2.0
            }

            Heuristic::MovementConsistency { weight } => {
                let Some(last) = last_action else {
                    return 0.0;
                };
                if action == last && action != BotAction::UseItem {
                    weight * 5.0
                } else if action.is_move() && action == last.reversed() {
                    weight * -10.0
                } else {
                    0.0
                }
            }

            Heuristic::TerritoryControl { weight, radius } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let mut control = 0.0;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let (x, y) = (pos.x + dx, pos.y + dy);
                        if !state.is_traversable(x, y) {
                            continue;
                        }
                        control += if state.cell_at(x, y).is_pellet() {
                            10.0
                        } else {
                            1.0
                        };
                        let d = pos.manhattan_distance(Position::new(x, y));
                        control += (radius - d) as f64 / radius as f64 * 5.0;
                    }
                }
                weight * control
            }

            Heuristic::OpponentBlocking { weight } => {
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                let mut blocking = 0.0;
                for opponent in state.animals.iter().filter(|a| a.id != animal_id) {
                    for pellet in state.nearby_pellets(opponent.position, 5) {
                        let opponent_d = opponent.position.manhattan_distance(pellet);
                        let my_d = pos.manhattan_distance(pellet);
                        if my_d < opponent_d {
                            blocking += (opponent_d - my_d) as f64 * 2.0;
                        }
                    }
                }
                weight * blocking
            }

            Heuristic::Endgame { weight, threshold } => {
                let total_cells = (state.width() * state.height()).max(1);
                let ratio = state.pellet_board.popcount() as f64 / total_cells as f64;
                if ratio > threshold {
                    return 0.0;
                }
                let Some(pos) = post_move(state, animal.position, action) else {
                    return invalid_or_zero(state, animal.position, action);
                };
                if state.cell_at(pos.x, pos.y).is_pellet() {
                    return weight * 100.0;
                }
                let nearest = state
                    .nearby_pellets(pos, 10)
                    .iter()
                    .map(|p| pos.manhattan_distance(*p))
                    .min();
                match nearest {
                    Some(d) => weight * (10 - d) as f64 * 5.0,
                    None => 0.0,
                }
            }
        }
    }
}

/// Position after a directional move, `None` for the stationary actions.
fn post_move(state: &GameState, from: Position, action: BotAction) -> Option<Position> {
    let (dx, dy) = action.offset()?;
    let target = Position::new(from.x + dx, from.y + dy);
    if state.is_valid_position(target.x, target.y) {
        Some(target)
    } else {
        None
    }
}

/// Stationary actions score 0 here; a move off the board takes the
/// sentinel.
fn invalid_or_zero(state: &GameState, from: Position, action: BotAction) -> f64 {
    match post_move(state, from, action) {
        Some(_) => 0.0,
        None if action.is_move() => INVALID_MOVE_SCORE,
        None => 0.0,
    }
}
