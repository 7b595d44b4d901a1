//! All-moves-as-first statistics.
//!
//! One global slot per action, fed with the full action sequence of every
//! rollout. During selection the AMAF mean is blended with the node's own
//! value using the usual visit-weighted schedule, so young nodes lean on
//! the global statistics and mature nodes on their own.

use std::sync::atomic::{AtomicU32, Ordering};

use zoo_core::BotAction;

use crate::atomic::AtomicF64;

#[derive(Debug)]
struct Slot {
    reward: AtomicF64,
    visits: AtomicU32,
}

/// Global per-action reward statistics.
#[derive(Debug)]
pub struct AmafTable {
    slots: [Slot; BotAction::COUNT],
    beta: f64,
}

impl AmafTable {
    pub fn new(beta: f64) -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot {
                reward: AtomicF64::new(0.0),
                visits: AtomicU32::new(0),
            }),
            beta,
        }
    }

    /// Record one rollout reward for an action.
    pub fn update(&self, action: BotAction, reward: f64) {
        let slot = &self.slots[action.index()];
        slot.reward.fetch_add(reward);
        slot.visits.fetch_add(1, Ordering::AcqRel);
    }

    /// Mean AMAF reward, `None` before the first observation.
    pub fn value(&self, action: BotAction) -> Option<f64> {
        let slot = &self.slots[action.index()];
        let visits = slot.visits.load(Ordering::Acquire);
        if visits == 0 {
            None
        } else {
            Some(slot.reward.load() / visits as f64)
        }
    }

    pub fn visits(&self, action: BotAction) -> u32 {
        self.slots[action.index()].visits.load(Ordering::Acquire)
    }

    /// Blend a node value with the action's AMAF mean:
    /// `w = v / (v + beta*v + beta)`, `combined = w*value + (1-w)*amaf`.
    /// With no AMAF data the node value passes through unchanged.
    pub fn combined_value(&self, mcts_value: f64, action: BotAction, visits: u32) -> f64 {
        let Some(amaf) = self.value(action) else {
            return mcts_value;
        };
        let v = visits as f64;
        let w = v / (v + self.beta * v + self.beta);
        w * mcts_value + (1.0 - w) * amaf
    }

    /// Drop every observation; called between searches.
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.reward.store(0.0);
            slot.visits.store(0, Ordering::Release);
        }
    }
}
