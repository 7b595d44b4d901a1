//! The facade the transport adapter talks to.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use zoo_core::GameState;

use crate::config::MctsConfig;
use crate::search::{MctsEngine, MctsResult, SearchError};

/// Owns an engine and the registered bot identity.
///
/// The adapter stores the id it received at registration with
/// [`BotService::set_id`]; every subsequent tick goes through
/// [`BotService::best_action`]. Until an id is registered the service
/// answers with the neutral action and no statistics.
#[derive(Debug)]
pub struct BotService {
    engine: MctsEngine,
    bot_id: Mutex<String>,
}

fn lock(id: &Mutex<String>) -> MutexGuard<'_, String> {
    id.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BotService {
    /// Service with a fresh engine using the balanced heuristic preset.
    pub fn new(config: MctsConfig) -> Self {
        Self::with_engine(MctsEngine::new(config))
    }

    pub fn with_engine(engine: MctsEngine) -> Self {
        Self {
            engine,
            bot_id: Mutex::new(String::new()),
        }
    }

    pub fn engine(&self) -> &MctsEngine {
        &self.engine
    }

    /// Store the id assigned at registration.
    pub fn set_id(&self, id: impl Into<String>) {
        let id = id.into();
        debug!(bot_id = %id, "bot id registered");
        *lock(&self.bot_id) = id;
    }

    pub fn id(&self) -> String {
        lock(&self.bot_id).clone()
    }

    /// Search the state with the registered identity. An empty id yields
    /// the neutral action without searching.
    pub fn best_action(&self, state: &GameState) -> Result<MctsResult, SearchError> {
        let id = self.id();
        if id.is_empty() {
            debug!("best_action requested before registration");
            return Ok(MctsResult::none());
        }
        if state.my_animal_id == id {
            self.engine.best_action(state, &id)
        } else {
            // The wire state does not know our identity; stamp it so the
            // simulator's own-animal terminal check lines up.
            let mut own = state.clone();
            own.my_animal_id = id.clone();
            self.engine.best_action(&own, &id)
        }
    }

    /// Cooperative shutdown: cancels any running search. The adapter's
    /// signal handler calls this.
    pub fn stop(&self) {
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoo_core::{Animal, BotAction, CellContent, Position};

    fn state_with_pellet() -> GameState {
        let mut state = GameState::new(9, 9);
        for x in 0..9 {
            state.set_cell(x, 0, CellContent::Wall);
            state.set_cell(x, 8, CellContent::Wall);
        }
        for y in 0..9 {
            state.set_cell(0, y, CellContent::Wall);
            state.set_cell(8, y, CellContent::Wall);
        }
        state.animals.push(Animal::new("bot-1", Position::new(4, 4)));
        state.set_cell(6, 4, CellContent::Pellet);
        state
    }

    #[test]
    fn test_empty_id_yields_none_without_stats() {
        let service = BotService::new(MctsConfig::for_testing());
        let result = service.best_action(&state_with_pellet()).unwrap();
        assert_eq!(result.best_action, BotAction::None);
        assert!(result.action_stats.is_empty());
    }

    #[test]
    fn test_registered_id_searches() {
        let service = BotService::new(MctsConfig::for_testing());
        service.set_id("bot-1");
        assert_eq!(service.id(), "bot-1");

        let result = service.best_action(&state_with_pellet()).unwrap();
        assert_ne!(result.best_action, BotAction::None);
        assert!(!result.action_stats.is_empty());
    }

    #[test]
    fn test_identity_is_stamped_onto_the_state() {
        let service = BotService::new(MctsConfig::for_testing());
        service.set_id("bot-1");

        // The wire state arrives without my_animal_id set.
        let state = state_with_pellet();
        assert!(state.my_animal_id.is_empty());
        let result = service.best_action(&state).unwrap();
        assert_ne!(result.best_action, BotAction::None);
    }

    #[test]
    fn test_unknown_id_degrades_to_none() {
        let service = BotService::new(MctsConfig::for_testing());
        service.set_id("somebody-else");
        let result = service.best_action(&state_with_pellet()).unwrap();
        assert_eq!(result.best_action, BotAction::None);
    }

    #[test]
    fn test_invalid_state_surfaces_error() {
        let service = BotService::new(MctsConfig::for_testing());
        service.set_id("bot-1");
        let broken = GameState::new(-1, 4);
        assert!(service.best_action(&broken).is_err());
    }
}
