//! The weighted heuristic collection.

use std::sync::Mutex;

use rustc_hash::FxHashMap;
use zoo_core::{BotAction, GameState};

use crate::heuristic::Heuristic;

/// An ordered collection of weighted heuristics.
///
/// `evaluate_action` returns the weighted sum of every heuristic's score;
/// `evaluate_all_actions` maps it over the legal actions. The engine also
/// remembers the last action it was told was chosen per animal
/// ([`HeuristicsEngine::note_chosen`]) so the movement-consistency signal
/// has something to compare against.
#[derive(Debug)]
pub struct HeuristicsEngine {
    heuristics: Vec<Heuristic>,
    last_chosen: Mutex<FxHashMap<String, BotAction>>,
}

impl HeuristicsEngine {
    pub fn new(heuristics: Vec<Heuristic>) -> Self {
        Self {
            heuristics,
            last_chosen: Mutex::new(FxHashMap::default()),
        }
    }

    /// The full heuristic set with the balanced preset weights.
    pub fn balanced() -> Self {
        Self::new(Heuristic::defaults())
    }

    pub fn add(&mut self, heuristic: Heuristic) {
        self.heuristics.push(heuristic);
    }

    pub fn remove(&mut self, name: &str) {
        self.heuristics.retain(|h| h.name() != name);
    }

    /// Set the weight of the named heuristic. Unknown names are ignored.
    pub fn set_weight(&mut self, name: &str, weight: f64) {
        for heuristic in &mut self.heuristics {
            if heuristic.name() == name {
                heuristic.set_weight(weight);
            }
        }
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.heuristics
            .iter()
            .find(|h| h.name() == name)
            .map(|h| h.weight())
    }

    /// Weighted sum over all heuristics for one action.
    pub fn evaluate_action(&self, state: &GameState, animal_id: &str, action: BotAction) -> f64 {
        let last = self.last_action(animal_id);
        self.heuristics
            .iter()
            .map(|h| h.evaluate(state, animal_id, action, last))
            .sum()
    }

    /// Scores for every legal action of the animal.
    pub fn evaluate_all_actions(
        &self,
        state: &GameState,
        animal_id: &str,
    ) -> FxHashMap<BotAction, f64> {
        state
            .legal_actions(animal_id)
            .into_iter()
            .map(|action| (action, self.evaluate_action(state, animal_id, action)))
            .collect()
    }

    /// Per-heuristic breakdown of one action's score, in collection order.
    pub fn contributions(
        &self,
        state: &GameState,
        animal_id: &str,
        action: BotAction,
    ) -> Vec<(&'static str, f64)> {
        let last = self.last_action(animal_id);
        self.heuristics
            .iter()
            .map(|h| (h.name(), h.evaluate(state, animal_id, action, last)))
            .collect()
    }

    /// Record the action actually chosen for an animal; feeds the
    /// movement-consistency signal on the next evaluation.
    pub fn note_chosen(&self, animal_id: &str, action: BotAction) {
        if let Ok(mut map) = self.last_chosen.lock() {
            map.insert(animal_id.to_string(), action);
        }
    }

    fn last_action(&self, animal_id: &str) -> Option<BotAction> {
        self.last_chosen
            .lock()
            .ok()
            .and_then(|map| map.get(animal_id).copied())
    }
}

impl Default for HeuristicsEngine {
    fn default() -> Self {
        Self::balanced()
    }
}
