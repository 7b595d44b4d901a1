//! The search engine: iteration loop, parallel workers, result assembly.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use heuristics::HeuristicsEngine;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;
use zoo_core::{BotAction, GameState, StateError};

use crate::amaf::AmafTable;
use crate::bandit::BanditPolicy;
use crate::config::MctsConfig;
use crate::node::MctsNode;
use crate::rollout;
use crate::transposition::TranspositionTable;

/// Scores this close count as tied and are broken at random.
const TIE_EPSILON: f64 = 1e-9;
/// Selection-score penalty per unit of virtual loss.
const VIRTUAL_LOSS_PENALTY: f64 = 10.0;
/// Rollout actions fed into RAVE/AMAF statistics per iteration.
const RAVE_MAX_ACTIONS: usize = 8;

/// Errors a search can surface. Soft conditions (missing animal, no legal
/// actions) are handled by returning a neutral result instead.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("structurally invalid game state: {0}")]
    InvalidState(#[from] StateError),
}

/// Visit statistics for one root action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStats {
    pub action: BotAction,
    pub visits: u32,
    pub average_reward: f64,
}

/// Outcome of one search.
#[derive(Debug, Clone)]
pub struct MctsResult {
    pub best_action: BotAction,
    pub action_stats: Vec<ActionStats>,
}

impl MctsResult {
    /// The neutral "no decision" result.
    pub(crate) fn none() -> Self {
        Self {
            best_action: BotAction::None,
            action_stats: Vec::new(),
        }
    }
}

/// The MCTS engine. One instance serves many sequential searches; each
/// search builds a fresh tree and clears the cross-iteration tables.
#[derive(Debug)]
pub struct MctsEngine {
    config: MctsConfig,
    heuristics: HeuristicsEngine,
    bandit: BanditPolicy,
    transposition: TranspositionTable,
    amaf: AmafTable,
    stop: AtomicBool,
    iterations: AtomicU32,
    expansions: AtomicU64,
}

impl MctsEngine {
    /// Engine with the balanced heuristic preset.
    pub fn new(config: MctsConfig) -> Self {
        Self::with_heuristics(config, HeuristicsEngine::balanced())
    }

    pub fn with_heuristics(config: MctsConfig, heuristics: HeuristicsEngine) -> Self {
        let bandit = config.bandit;
        let transposition = TranspositionTable::new(config.transposition_capacity);
        let amaf = AmafTable::new(config.amaf_beta);
        Self {
            config,
            heuristics,
            bandit,
            transposition,
            amaf,
            stop: AtomicBool::new(false),
            iterations: AtomicU32::new(0),
            expansions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn heuristics(&self) -> &HeuristicsEngine {
        &self.heuristics
    }

    /// Install a different selection bandit for subsequent searches.
    pub fn set_bandit(&mut self, bandit: BanditPolicy) {
        self.bandit = bandit;
    }

    /// Cooperative cancellation: workers observe the flag at iteration
    /// boundaries and the running search returns its best answer so far.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Iterations completed by the last search.
    pub fn total_iterations(&self) -> u32 {
        self.iterations.load(Ordering::Acquire)
    }

    /// Nodes expanded by the last search.
    pub fn total_expansions(&self) -> u64 {
        self.expansions.load(Ordering::Acquire)
    }

    /// Search the given state for the acting animal's best action.
    ///
    /// Always produces an action: with no search results the first legal
    /// action in heuristic order is returned, and with no legal actions at
    /// all (or no such animal) the neutral [`BotAction::None`].
    pub fn best_action(
        &self,
        state: &GameState,
        player_id: &str,
    ) -> Result<MctsResult, SearchError> {
        state.validate()?;

        self.stop.store(false, Ordering::Release);
        self.iterations.store(0, Ordering::Release);
        self.expansions.store(0, Ordering::Release);
        self.transposition.clear();
        self.amaf.clear();

        if state.animal(player_id).is_none() {
            debug!(player_id, "acting animal missing from state");
            return Ok(MctsResult::none());
        }

        // Heuristic move ordering: the pre-search ranking of root actions,
        // and the fallback when the tree ends up empty.
        let mut move_order: Vec<(BotAction, f64)> = self
            .heuristics
            .evaluate_all_actions(state, player_id)
            .into_iter()
            .collect();
        move_order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(CmpOrdering::Equal));

        let root = MctsNode::new_root(state.clone(), player_id);
        let start = Instant::now();
        // Keep 5% of the budget in reserve for result assembly.
        let deadline = start + self.config.time_budget.mul_f64(0.95);
        let bandit = self.bandit.with_exploration(self.config.exploration_constant);

        let workers = self.config.worker_count.max(1);
        if workers == 1 {
            self.run_worker(&root, 0, deadline, bandit, false);
        } else {
            std::thread::scope(|scope| {
                for worker in 0..workers {
                    let root = &root;
                    scope.spawn(move || self.run_worker(root, worker, deadline, bandit, true));
                }
            });
        }

        let mut action_stats: Vec<ActionStats> = root
            .children()
            .iter()
            .map(|child| ActionStats {
                action: child.action(),
                visits: child.visits(),
                average_reward: child.average_reward(),
            })
            .collect();
        action_stats.sort_by(|a, b| {
            b.visits.cmp(&a.visits).then(
                b.average_reward
                    .partial_cmp(&a.average_reward)
                    .unwrap_or(CmpOrdering::Equal),
            )
        });

        let best_action = match root.most_visited_child() {
            Some(child) => child.action(),
            None => move_order
                .first()
                .map(|(action, _)| *action)
                .unwrap_or(BotAction::None),
        };
        if best_action != BotAction::None {
            self.heuristics.note_chosen(player_id, best_action);
        }

        let tree = root.subtree_stats();
        debug!(
            tick = state.tick,
            iterations = self.total_iterations(),
            expansions = self.total_expansions(),
            nodes = tree.total_nodes,
            depth = tree.max_depth,
            elapsed_ms = start.elapsed().as_millis() as u64,
            action = best_action.to_wire(),
            "search complete"
        );

        Ok(MctsResult {
            best_action,
            action_stats,
        })
    }

    fn run_worker(
        &self,
        root: &Arc<MctsNode>,
        worker: usize,
        deadline: Instant,
        bandit: BanditPolicy,
        parallel: bool,
    ) {
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let seed = clock ^ (worker as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        loop {
            if self.stop.load(Ordering::Acquire) || Instant::now() >= deadline {
                break;
            }
            let ticket = self.iterations.fetch_add(1, Ordering::AcqRel);
            if ticket >= self.config.max_iterations {
                self.iterations.fetch_sub(1, Ordering::AcqRel);
                break;
            }
            self.iterate(root, bandit, parallel, &mut rng);
        }
    }

    /// One full iteration: select, expand, simulate, backpropagate.
    fn iterate<R: Rng>(
        &self,
        root: &Arc<MctsNode>,
        bandit: BanditPolicy,
        parallel: bool,
        rng: &mut R,
    ) {
        let mut path = vec![Arc::clone(root)];
        let mut current = Arc::clone(root);

        while current.is_fully_expanded() && !current.is_terminal() {
            let Some(next) = self.select_child(&current, bandit, parallel, rng) else {
                break;
            };
            if parallel {
                next.add_virtual_loss(self.config.virtual_loss);
            }
            path.push(Arc::clone(&next));
            current = next;
        }

        if !current.is_terminal() {
            if let Some(child) = MctsNode::expand(&current, rng) {
                self.expansions.fetch_add(1, Ordering::Relaxed);
                if self.config.use_transposition {
                    self.merge_transposition(&child);
                }
                if parallel {
                    child.add_virtual_loss(self.config.virtual_loss);
                }
                path.push(Arc::clone(&child));
                current = child;
            }
        }

        let outcome = rollout::simulate(
            current.state(),
            current.player_id(),
            self.config.max_simulation_depth,
            rng,
        );
        let reward = rollout::normalize_reward(outcome.reward);

        let rave_actions = &outcome.actions[..outcome.actions.len().min(RAVE_MAX_ACTIONS)];
        for node in path.iter().rev() {
            node.update(reward);
            if parallel {
                node.remove_virtual_loss(self.config.virtual_loss);
            }
            for &action in rave_actions {
                node.update_rave(action, reward);
            }
        }
        if self.config.use_amaf {
            for &action in rave_actions {
                self.amaf.update(action, reward);
            }
        }
    }

    /// Seed a freshly expanded child from a previously seen equivalent
    /// state, then publish it. Merging copies statistics only; the tree
    /// itself stays acyclic.
    fn merge_transposition(&self, child: &Arc<MctsNode>) {
        let digest = child.state().digest();
        match self.transposition.lookup(digest) {
            Some(existing) if !Arc::ptr_eq(&existing, child) => {
                child.seed_statistics(
                    existing.visits(),
                    existing.total_reward(),
                    existing.total_squared_reward(),
                );
            }
            Some(_) => {}
            None => self.transposition.insert(digest, child),
        }
    }

    fn select_child<R: Rng>(
        &self,
        node: &Arc<MctsNode>,
        bandit: BanditPolicy,
        parallel: bool,
        rng: &mut R,
    ) -> Option<Arc<MctsNode>> {
        let children = node.children();
        if children.is_empty() {
            return None;
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best: Vec<Arc<MctsNode>> = Vec::new();
        for child in children {
            let score = self.selection_score(&child, bandit, parallel);
            if score == f64::INFINITY && best_score == f64::INFINITY {
                best.push(child);
            } else if score > best_score + TIE_EPSILON {
                best_score = score;
                best.clear();
                best.push(child);
            } else if (score - best_score).abs() <= TIE_EPSILON {
                best.push(child);
            }
        }

        match best.len() {
            0 => None,
            1 => best.pop(),
            n => Some(best.swap_remove(rng.gen_range(0..n))),
        }
    }

    fn selection_score(&self, child: &MctsNode, bandit: BanditPolicy, parallel: bool) -> f64 {
        let mut score = bandit.score(child);
        if score.is_infinite() {
            return score;
        }
        if self.config.progressive_bias {
            score += self.progressive_bias(child);
        }
        if self.config.use_amaf {
            let combined =
                self.amaf
                    .combined_value(child.average_reward(), child.action(), child.visits());
            score = (1.0 - self.config.amaf_weight) * score + self.config.amaf_weight * combined;
        }
        if parallel && child.virtual_loss() > 0 {
            score -= VIRTUAL_LOSS_PENALTY * child.virtual_loss() as f64;
        }
        score
    }

    /// Heuristic shading that decays with visits: rewards proximity to
    /// pellets and a collection on the child's own cell, nudges away from
    /// lines that are about to lose the streak.
    fn progressive_bias(&self, child: &MctsNode) -> f64 {
        let state = child.state();
        let Some(animal) = state.animal(child.player_id()) else {
            return 0.0;
        };
        let mut signal = 0.0;
        let pellet_distance = state.distance_to_nearest_pellet(animal.position);
        if pellet_distance >= 0 {
            signal += 1.0 / (1.0 + pellet_distance as f64);
        }
        if animal.ticks_since_last_pellet == 0 {
            signal += 10.0;
        } else if animal.ticks_since_last_pellet >= 2 {
            signal -= 2.0;
        }
        let decay = 1.0 + (child.visits() as f64).powf(self.config.bias_decay);
        self.config.bias_weight * signal / decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zoo_core::{Animal, CellContent, Position};

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
    fn test_invalid_state_is_refused() {
        let engine = MctsEngine::new(MctsConfig::for_testing());
        let state = GameState::new(0, 0);
        assert!(matches!(
            engine.best_action(&state, "a1"),
            Err(SearchError::InvalidState(_))
        ));
    }

    #[test]
    fn test_missing_animal_yields_none() {
        let engine = MctsEngine::new(MctsConfig::for_testing());
        let state = walled_state(7, 7, Position::new(1, 1));
        let result = engine.best_action(&state, "ghost").unwrap();
        assert_eq!(result.best_action, BotAction::None);
        assert!(result.action_stats.is_empty());
    }

    #[test]
    fn test_boxed_in_animal_yields_none() {
        // Animal sealed in a 1x1 pocket with a pellet elsewhere: no legal
        // actions, no children, no heuristic fallback.
        let mut state = walled_state(7, 7, Position::new(1, 1));
        state.set_cell(2, 1, CellContent::Wall);
        state.set_cell(1, 2, CellContent::Wall);
        state.set_cell(4, 4, CellContent::Pellet);

        let engine = MctsEngine::new(MctsConfig::for_testing());
        let result = engine.best_action(&state, "a1").unwrap();
        assert_eq!(result.best_action, BotAction::None);
        assert!(result.action_stats.is_empty());
    }

    #[test]
    fn test_single_escape_route_is_found() {
        // One open direction towards the only pellet.
        let mut state = walled_state(7, 7, Position::new(1, 1));
        state.set_cell(1, 2, CellContent::Wall);
        state.set_cell(2, 1, CellContent::Empty);
        state.set_cell(3, 1, CellContent::Pellet);

        let engine = MctsEngine::new(MctsConfig::for_testing());
        let result = engine.best_action(&state, "a1").unwrap();
        assert_eq!(result.best_action, BotAction::Right);
        assert!(!result.action_stats.is_empty());
    }

    #[test]
    fn test_action_stats_cover_all_root_children() {
        let mut state = walled_state(9, 9, Position::new(4, 4));
        state.set_cell(6, 4, CellContent::Pellet);

        let engine = MctsEngine::new(MctsConfig::for_testing());
        let result = engine.best_action(&state, "a1").unwrap();

        // All four moves are legal from the centre.
        assert_eq!(result.action_stats.len(), 4);
        // Sorted by visits, descending.
        for pair in result.action_stats.windows(2) {
            assert!(pair[0].visits >= pair[1].visits);
        }
        let total: u32 = result.action_stats.iter().map(|s| s.visits).sum();
        assert!(total > 0);
        assert!(total <= engine.total_iterations());
    }

    #[test]
    fn test_visit_sums_match_iterations_single_worker() {
        let mut state = walled_state(9, 9, Position::new(4, 4));
        state.set_cell(6, 4, CellContent::Pellet);
        state.set_cell(2, 4, CellContent::Pellet);

        let engine = MctsEngine::new(
            MctsConfig::for_testing()
                .with_max_iterations(300)
                .with_time_budget(Duration::from_secs(5)),
        );
        let result = engine.best_action(&state, "a1").unwrap();

        // Every completed iteration descends through exactly one root child
        // once the root is expanded; the first few expand the root itself.
        let child_visits: u32 = result.action_stats.iter().map(|s| s.visits).sum();
        let iterations = engine.total_iterations();
        assert_eq!(iterations, 300);
        assert!(child_visits <= iterations);
        assert!(child_visits >= iterations - 1);
    }

    #[test]
    fn test_stop_flag_short_circuits() {
        let engine = MctsEngine::new(MctsConfig::for_testing());
        engine.stop();
        let mut state = walled_state(9, 9, Position::new(4, 4));
        state.set_cell(6, 4, CellContent::Pellet);
        // stop() only binds a running search; best_action resets it.
        let result = engine.best_action(&state, "a1").unwrap();
        assert_ne!(result.best_action, BotAction::None);
    }

    #[test]
    fn test_set_bandit_swaps_policy() {
        let mut engine = MctsEngine::new(MctsConfig::for_testing());
        engine.set_bandit(BanditPolicy::Ucb1Tuned { exploration: 1.0 });
        let mut state = walled_state(9, 9, Position::new(4, 4));
        state.set_cell(6, 4, CellContent::Pellet);
        let result = engine.best_action(&state, "a1").unwrap();
        assert_ne!(result.best_action, BotAction::None);
    }
}
