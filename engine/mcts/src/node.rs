//! The shared search-tree node.
//!
//! Nodes are owned by their parent's child list (`Arc`) with non-owning
//! `Weak` back-pointers, so the tree stays acyclic while workers hold
//! references across lock boundaries. All statistics are atomic; the only
//! blocking points are the child list and the expansion lock, which
//! serialises concurrent expanders and guarantees at most one new child
//! per expansion slot.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rand::Rng;
use zoo_core::{BotAction, GameState};

use crate::atomic::AtomicF64;

/// Per-action RAVE statistics local to one node.
#[derive(Debug)]
struct RaveSlot {
    reward: AtomicF64,
    visits: AtomicU32,
}

impl RaveSlot {
    fn new() -> Self {
        Self {
            reward: AtomicF64::new(0.0),
            visits: AtomicU32::new(0),
        }
    }
}

/// Aggregate shape of a search tree, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub max_depth: u32,
    pub total_visits: u64,
}

/// One node of the shared MCTS tree.
#[derive(Debug)]
pub struct MctsNode {
    state: GameState,
    action: BotAction,
    player_id: Arc<str>,
    depth: u32,
    parent: Weak<MctsNode>,
    children: Mutex<Vec<Arc<MctsNode>>>,
    visits: AtomicU32,
    total_reward: AtomicF64,
    total_squared_reward: AtomicF64,
    virtual_loss: AtomicU32,
    terminal: bool,
    fully_expanded: AtomicBool,
    expansion: Mutex<()>,
    rave: [RaveSlot; BotAction::COUNT],
}

/// Locks recover from poisoning: a panicking worker must not wedge the
/// whole search.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MctsNode {
    /// A root node for the given position. The action tag is a placeholder
    /// and never reported.
    pub fn new_root(state: GameState, player_id: &str) -> Arc<Self> {
        Self::build(state, BotAction::Up, Arc::from(player_id), 0, Weak::new())
    }

    fn build(
        state: GameState,
        action: BotAction,
        player_id: Arc<str>,
        depth: u32,
        parent: Weak<MctsNode>,
    ) -> Arc<Self> {
        let terminal = state.is_terminal();
        Arc::new(Self {
            state,
            action,
            player_id,
            depth,
            parent,
            children: Mutex::new(Vec::new()),
            visits: AtomicU32::new(0),
            total_reward: AtomicF64::new(0.0),
            total_squared_reward: AtomicF64::new(0.0),
            virtual_loss: AtomicU32::new(0),
            terminal,
            fully_expanded: AtomicBool::new(terminal),
            expansion: Mutex::new(()),
            rave: std::array::from_fn(|_| RaveSlot::new()),
        })
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[inline]
    pub fn action(&self) -> BotAction {
        self.action
    }

    #[inline]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<Arc<MctsNode>> {
        self.parent.upgrade()
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<Arc<MctsNode>> {
        lock(&self.children).clone()
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Monotone: once set it never clears.
    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.fully_expanded.load(Ordering::Acquire)
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::Acquire)
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward.load()
    }

    pub fn total_squared_reward(&self) -> f64 {
        self.total_squared_reward.load()
    }

    pub fn average_reward(&self) -> f64 {
        let visits = self.visits();
        if visits == 0 {
            0.0
        } else {
            self.total_reward.load() / visits as f64
        }
    }

    /// Sample variance of the backed-up rewards, from the running sum of
    /// squares.
    pub fn reward_variance(&self) -> f64 {
        let visits = self.visits();
        if visits <= 1 {
            return 0.0;
        }
        let mean = self.average_reward();
        let mean_squared = self.total_squared_reward.load() / visits as f64;
        (mean_squared - mean * mean).max(0.0)
    }

    /// Record one backed-up reward.
    pub fn update(&self, reward: f64) {
        self.visits.fetch_add(1, Ordering::AcqRel);
        self.total_reward.fetch_add(reward);
        self.total_squared_reward.fetch_add(reward * reward);
    }

    /// Fold another node's statistics in, weighted by its visit count.
    /// Used when the transposition table recognises the expanded state.
    pub fn seed_statistics(&self, visits: u32, total_reward: f64, total_squared_reward: f64) {
        if visits == 0 {
            return;
        }
        self.visits.fetch_add(visits, Ordering::AcqRel);
        self.total_reward.fetch_add(total_reward);
        self.total_squared_reward.fetch_add(total_squared_reward);
    }

    #[inline]
    pub fn virtual_loss(&self) -> u32 {
        self.virtual_loss.load(Ordering::Acquire)
    }

    pub fn add_virtual_loss(&self, amount: u32) {
        self.virtual_loss.fetch_add(amount, Ordering::AcqRel);
    }

    pub fn remove_virtual_loss(&self, amount: u32) {
        // Saturating: backprop may race a concurrent selection.
        let mut current = self.virtual_loss.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_sub(amount);
            match self.virtual_loss.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Plain UCB1. Unvisited nodes score infinity; the root scores its
    /// exploitation term.
    pub fn ucb1(&self, exploration: f64) -> f64 {
        let visits = self.visits();
        if visits == 0 {
            return f64::INFINITY;
        }
        let Some(parent) = self.parent.upgrade() else {
            return self.average_reward();
        };
        let log_parent = (parent.visits().max(1) as f64).ln();
        self.average_reward() + exploration * (log_parent / visits as f64).sqrt()
    }

    /// UCB1-Tuned with the usual 1/4 variance ceiling.
    pub fn ucb1_tuned(&self, exploration: f64) -> f64 {
        let visits = self.visits();
        if visits == 0 {
            return f64::INFINITY;
        }
        let Some(parent) = self.parent.upgrade() else {
            return self.average_reward();
        };
        let log_parent = (parent.visits().max(1) as f64).ln();
        let n = visits as f64;
        let variance_bound = self.reward_variance() + (2.0 * log_parent / n).sqrt();
        self.average_reward()
            + exploration * (log_parent / n * variance_bound.min(0.25)).sqrt()
    }

    /// Expand one untried action of `node`, chosen uniformly at random.
    /// Returns `None` when the node is terminal or already fully expanded;
    /// concurrent expanders serialise on the expansion lock.
    pub fn expand<R: Rng>(node: &Arc<MctsNode>, rng: &mut R) -> Option<Arc<MctsNode>> {
        if node.terminal || node.is_fully_expanded() {
            return None;
        }
        let _guard = lock(&node.expansion);
        if node.is_fully_expanded() {
            return None;
        }

        let legal = node.state.legal_actions(&node.player_id);
        let tried: Vec<BotAction> = lock(&node.children).iter().map(|c| c.action()).collect();
        let untried: Vec<BotAction> = legal
            .iter()
            .copied()
            .filter(|a| !tried.contains(a))
            .collect();

        if untried.is_empty() {
            node.fully_expanded.store(true, Ordering::Release);
            return None;
        }

        let action = untried[rng.gen_range(0..untried.len())];
        let mut child_state = node.state.clone();
        child_state.apply_action(&node.player_id, action);

        let child = Self::build(
            child_state,
            action,
            Arc::clone(&node.player_id),
            node.depth + 1,
            Arc::downgrade(node),
        );

        let mut children = lock(&node.children);
        children.push(Arc::clone(&child));
        if children.len() >= legal.len() {
            node.fully_expanded.store(true, Ordering::Release);
        }
        Some(child)
    }

    /// Robust choice: highest visit count, average reward as tie-break.
    pub fn most_visited_child(&self) -> Option<Arc<MctsNode>> {
        self.children().into_iter().max_by(|a, b| {
            (a.visits(), a.average_reward())
                .partial_cmp(&(b.visits(), b.average_reward()))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Exploratory choice: highest UCB1-Tuned score, or highest average
    /// reward when `exploration` is zero.
    pub fn best_child(&self, exploration: f64) -> Option<Arc<MctsNode>> {
        let children = self.children();
        if exploration == 0.0 {
            children.into_iter().max_by(|a, b| {
                a.average_reward()
                    .partial_cmp(&b.average_reward())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        } else {
            children.into_iter().max_by(|a, b| {
                a.ucb1_tuned(exploration)
                    .partial_cmp(&b.ucb1_tuned(exploration))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        }
    }

    /// Aggregate statistics over this node's subtree.
    pub fn subtree_stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            total_nodes: 0,
            max_depth: 0,
            total_visits: 0,
        };
        self.collect_stats(0, &mut stats);
        stats
    }

    fn collect_stats(&self, depth: u32, stats: &mut TreeStats) {
        stats.total_nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);
        stats.total_visits += self.visits() as u64;
        for child in self.children() {
            child.collect_stats(depth + 1, stats);
        }
    }

    /// Record a RAVE observation for one action at this node.
    pub fn update_rave(&self, action: BotAction, reward: f64) {
        let slot = &self.rave[action.index()];
        slot.reward.fetch_add(reward);
        slot.visits.fetch_add(1, Ordering::AcqRel);
    }

    /// Mean RAVE reward for the action, `None` before any observation.
    pub fn rave_value(&self, action: BotAction) -> Option<f64> {
        let slot = &self.rave[action.index()];
        let visits = slot.visits.load(Ordering::Acquire);
        if visits == 0 {
            None
        } else {
            Some(slot.reward.load() / visits as f64)
        }
    }

    pub fn rave_visits(&self, action: BotAction) -> u32 {
        self.rave[action.index()].visits.load(Ordering::Acquire)
    }
}
