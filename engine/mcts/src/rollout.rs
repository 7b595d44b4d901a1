//! Monte-Carlo rollouts.
//!
//! A rollout clones the node's state and plays it forward with a fast
//! greedy policy until the depth bound, a terminal state, a capture, or a
//! cycle overdose. The running reward mixes discounted score deltas with
//! exploration shaping; the final state adds a bounded positional
//! evaluation. The whole return is squashed into `[0, 100]` before it is
//! backed up so the bandit's confidence bounds stay meaningful.

use rand::Rng;
use rustc_hash::FxHashSet;
use zoo_core::{BotAction, CellContent, GameState, PowerUpKind};

/// Per-step discount.
const GAMMA: f64 = 0.95;
/// Bonus for stepping onto a cell this rollout has not seen.
const EXPLORATION_REWARD: f64 = 20.0;
/// Penalty for re-treading old ground.
const REVISIT_PENALTY: f64 = 10.0;
/// Penalty per repeated state digest.
const CYCLE_PENALTY: f64 = 100.0;
/// Flat penalty per detected cycle, applied after the rollout.
const CYCLE_TAX: f64 = 1000.0;
/// Cycles tolerated before the rollout is cut short.
const MAX_CYCLES: u32 = 3;
/// Penalty for getting caught mid-rollout.
const CAPTURE_PENALTY: f64 = 500.0;
/// Terminal value of a caught final state.
const CAUGHT_SCORE: f64 = -7500.0;
/// Scale of the tanh squash applied to the final return.
const REWARD_SCALE: f64 = 20_000.0;

/// What one rollout produced: the discounted return and the action
/// sequence for AMAF/RAVE updates.
#[derive(Debug)]
pub(crate) struct RolloutOutcome {
    pub reward: f64,
    pub actions: Vec<BotAction>,
}

/// Play the state forward up to `max_depth` ticks.
pub(crate) fn simulate<R: Rng>(
    start: &GameState,
    player_id: &str,
    max_depth: u32,
    rng: &mut R,
) -> RolloutOutcome {
    let mut sim = start.clone();
    let mut reward = 0.0;
    let mut decay = 1.0;
    let mut cycles = 0u32;
    let mut actions = Vec::new();

    let mut seen = FxHashSet::default();
    seen.insert(sim.positional_digest());

    for _ in 0..max_depth {
        if sim.is_terminal() {
            break;
        }
        let legal = sim.legal_actions(player_id);
        if legal.is_empty() {
            break;
        }

        let action = select_action(&sim, player_id, &legal, rng);
        let (score_before, streak_before) = sim
            .animal(player_id)
            .map(|a| (a.score, a.score_streak))
            .unwrap_or((0, 1));
        let visited_before = sim.visited_cells.len();

        sim.apply_action(player_id, action);
        actions.push(action);

        let score_after = sim.animal(player_id).map(|a| a.score).unwrap_or(score_before);
        let delta = (score_after - score_before) as f64;
        if delta > 0.0 {
            reward += decay * delta * 100.0 * streak_before.max(1) as f64;
        }

        if action.is_move() {
            if sim.visited_cells.len() > visited_before {
                reward += decay * EXPLORATION_REWARD;
            } else {
                reward -= decay * REVISIT_PENALTY;
            }
        }

        if !seen.insert(sim.positional_digest()) {
            reward -= decay * CYCLE_PENALTY;
            cycles += 1;
            if cycles > MAX_CYCLES {
                break;
            }
        }

        if sim.is_player_caught(player_id) {
            reward -= decay * CAPTURE_PENALTY;
            break;
        }

        decay *= GAMMA;
    }

    reward += decay * evaluate_terminal(&sim, player_id);
    reward -= CYCLE_TAX * cycles as f64;

    RolloutOutcome { reward, actions }
}

/// Fast greedy simulation policy: score every legal action and take the
/// best, with a little uniform noise to keep rollouts diverse. A held
/// scavenger is always fired.
pub(crate) fn select_action<R: Rng>(
    state: &GameState,
    player_id: &str,
    legal: &[BotAction],
    rng: &mut R,
) -> BotAction {
    let held = state.animal(player_id).and_then(|a| a.held_power_up);
    if held == Some(PowerUpKind::Scavenger) && legal.contains(&BotAction::UseItem) {
        return BotAction::UseItem;
    }

    let mut best = legal[0];
    let mut best_score = f64::NEG_INFINITY;
    for &action in legal {
        let score = score_action(state, player_id, action) + rng.gen::<f64>();
        if score > best_score {
            best_score = score;
            best = action;
        }
    }
    best
}

fn score_action(state: &GameState, player_id: &str, action: BotAction) -> f64 {
    let Some(animal) = state.animal(player_id) else {
        return 0.0;
    };
    let streak = animal.score_streak.max(1) as f64;

    let Some((dx, dy)) = action.offset() else {
        // UseItem for the non-scavenger kinds.
        return match animal.held_power_up {
            Some(PowerUpKind::Cloak) => state.zookeeper_threat(animal.position) * 10.0,
            Some(PowerUpKind::MultiplierJuice) => {
                state.count_pellets_in_area(animal.position, 3) as f64 * streak * 2.0
            }
            _ => 0.0,
        };
    };

    let target = zoo_core::Position::new(animal.position.x + dx, animal.position.y + dy);
    let mut score = match state.cell_at(target.x, target.y) {
        CellContent::Pellet => 100.0 * streak,
        CellContent::PowerPellet => 150.0 * streak,
        CellContent::PowerUp(PowerUpKind::Scavenger) => 120.0,
        CellContent::PowerUp(PowerUpKind::MultiplierJuice) => 100.0,
        CellContent::PowerUp(PowerUpKind::Cloak) => 80.0,
        CellContent::Empty | CellContent::Wall => 0.0,
    };

    let pellet_distance = state.distance_to_nearest_pellet(target);
    if pellet_distance >= 0 {
        score += 50.0 / (1.0 + pellet_distance as f64);
    }
    score -= 15.0 * state.zookeeper_threat(target);
    score
}

/// Bounded positional evaluation of a final rollout state.
pub(crate) fn evaluate_terminal(state: &GameState, player_id: &str) -> f64 {
    let Some(animal) = state.animal(player_id) else {
        return 0.0;
    };
    if animal.is_caught {
        return CAUGHT_SCORE;
    }

    let pos = animal.position;
    let mut score = animal.score as f64;

    let streak = animal.score_streak as f64;
    score += 15.0 * streak * streak;
    if animal.ticks_since_last_pellet == 0 {
        score += 100.0;
    } else if animal.ticks_since_last_pellet >= 2 {
        score -= 200.0 * animal.ticks_since_last_pellet as f64;
    }

    let threat = state.zookeeper_threat(pos);
    score -= 5.0 * threat;
    if threat >= 8.0 {
        score -= 2000.0;
    }

    score += match animal.held_power_up {
        Some(PowerUpKind::Scavenger) => 300.0,
        Some(PowerUpKind::MultiplierJuice) => 200.0,
        Some(PowerUpKind::Cloak) => 50.0 + 20.0 * threat,
        None => 0.0,
    };
    if animal.power_up_duration > 0 {
        score += 50.0 * (animal.power_up_duration + 1) as f64;
    }

    let pellet_distance = state.distance_to_nearest_pellet(pos);
    if pellet_distance >= 0 {
        let max_distance = (state.width() + state.height()).max(1);
        score += 30.0 * (max_distance - pellet_distance) as f64;
    }

    if let Some(d) = state
        .nearby_power_ups(pos, 5)
        .iter()
        .map(|p| pos.manhattan_distance(*p))
        .min()
    {
        score += (5 - d) as f64 * 10.0;
    }

    let total_cells = (state.width() * state.height()).max(1) as f64;
    let visited_ratio = state.visited_cells.len() as f64 / total_cells;
    if visited_ratio >= 0.05 {
        score += 500.0 * visited_ratio.min(0.25);
    }
    if visited_ratio < 0.20 {
        score -= 500.0 * (0.20 - visited_ratio);
    }

    score
}

/// Squash a raw rollout return into `[0, 100]`.
pub(crate) fn normalize_reward(raw: f64) -> f64 {
    50.0 * ((raw / REWARD_SCALE).tanh() + 1.0)
}
