//! Selection bandits.
//!
//! The selection phase scores children with one of four confidence-bound
//! variants. A small closed enum beats open polymorphism here: the set is
//! fixed, the parameters differ per variant, and the engine swaps policies
//! with a plain setter.

use crate::node::MctsNode;

/// Rewards are normalised into this range before backpropagation; UCB-V's
/// bounded-support term relies on it.
pub(crate) const REWARD_BOUND: f64 = 100.0;

/// The bandit used to score children during selection. Unvisited children
/// always score infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BanditPolicy {
    /// Classic UCB1.
    Ucb1 { exploration: f64 },
    /// Variance-aware UCB-V with bounded rewards.
    UcbV { exploration: f64 },
    /// UCB1-Tuned with the 1/4 variance ceiling.
    Ucb1Tuned { exploration: f64 },
    /// UCB1 whose exploration constant decays with tree depth, so deep
    /// lines exploit harder than shallow ones.
    EnhancedUcb1 { exploration: f64, depth_decay: f64 },
}

impl Default for BanditPolicy {
    fn default() -> Self {
        BanditPolicy::UcbV {
            exploration: std::f64::consts::SQRT_2,
        }
    }
}

impl BanditPolicy {
    /// Same variant with a different exploration constant.
    pub fn with_exploration(self, exploration: f64) -> Self {
        match self {
            BanditPolicy::Ucb1 { .. } => BanditPolicy::Ucb1 { exploration },
            BanditPolicy::UcbV { .. } => BanditPolicy::UcbV { exploration },
            BanditPolicy::Ucb1Tuned { .. } => BanditPolicy::Ucb1Tuned { exploration },
            BanditPolicy::EnhancedUcb1 { depth_decay, .. } => BanditPolicy::EnhancedUcb1 {
                exploration,
                depth_decay,
            },
        }
    }

    /// Score a child for selection from its parent.
    pub fn score(&self, node: &MctsNode) -> f64 {
        let visits = node.visits();
        if visits == 0 {
            return f64::INFINITY;
        }
        match *self {
            BanditPolicy::Ucb1 { exploration } => node.ucb1(exploration),
            BanditPolicy::Ucb1Tuned { exploration } => node.ucb1_tuned(exploration),
            BanditPolicy::UcbV { exploration } => {
                let Some(parent) = node.parent() else {
                    return node.average_reward();
                };
                let n = visits as f64;
                let log_parent = (parent.visits().max(1) as f64).ln();
                let variance_term = (2.0 * node.reward_variance() * log_parent / n).sqrt();
                let bound_term = 3.0 * REWARD_BOUND * log_parent / n;
                node.average_reward() + variance_term + exploration * bound_term
            }
            BanditPolicy::EnhancedUcb1 {
                exploration,
                depth_decay,
            } => {
                let effective = exploration / (1.0 + node.depth() as f64 * depth_decay);
                node.ucb1(effective)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use zoo_core::{Animal, CellContent, GameState, Position};

    fn two_child_root() -> (
        std::sync::Arc<MctsNode>,
        std::sync::Arc<MctsNode>,
        std::sync::Arc<MctsNode>,
    ) {
        let mut state = GameState::new(7, 7);
        state.set_cell(5, 5, CellContent::Pellet);
        state.animals.push(Animal::new("a1", Position::new(3, 0)));
        state.my_animal_id = "a1".to_string();
        // Only Left/Right/Down are in bounds at the top edge; block Down.
        state.set_cell(3, 1, CellContent::Wall);

        let root = MctsNode::new_root(state, "a1");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let a = MctsNode::expand(&root, &mut rng).unwrap();
        let b = MctsNode::expand(&root, &mut rng).unwrap();
        (root, a, b)
    }

    #[test]
    fn test_unvisited_is_infinite_for_all_variants() {
        let (_root, a, _b) = two_child_root();
        let policies = [
            BanditPolicy::Ucb1 { exploration: 1.4 },
            BanditPolicy::UcbV { exploration: 1.4 },
            BanditPolicy::Ucb1Tuned { exploration: 1.4 },
            BanditPolicy::EnhancedUcb1 {
                exploration: 1.4,
                depth_decay: 0.5,
            },
        ];
        for policy in policies {
            assert!(policy.score(&a).is_infinite());
        }
    }

    #[test]
    fn test_better_child_wins_once_visited() {
        let (root, a, b) = two_child_root();
        for _ in 0..20 {
            root.update(0.0);
            a.update(80.0);
            b.update(20.0);
        }
        let policies = [
            BanditPolicy::Ucb1 { exploration: 1.4 },
            BanditPolicy::UcbV { exploration: 1.4 },
            BanditPolicy::Ucb1Tuned { exploration: 1.4 },
            BanditPolicy::EnhancedUcb1 {
                exploration: 1.4,
                depth_decay: 0.5,
            },
        ];
        for policy in policies {
            assert!(policy.score(&a) > policy.score(&b), "{policy:?}");
        }
    }

    #[test]
    fn test_enhanced_decays_exploration_with_depth() {
        let (root, a, _b) = two_child_root();
        for _ in 0..5 {
            root.update(50.0);
            a.update(50.0);
        }
        let shallow = BanditPolicy::Ucb1 { exploration: 2.0 }.score(&a);
        let decayed = BanditPolicy::EnhancedUcb1 {
            exploration: 2.0,
            depth_decay: 0.5,
        }
        .score(&a);
        // Depth 1 halves the remaining exploration margin.
        assert!(decayed < shallow);
        assert!(decayed > a.average_reward());
    }

    #[test]
    fn test_with_exploration_preserves_variant() {
        let policy = BanditPolicy::EnhancedUcb1 {
            exploration: 1.0,
            depth_decay: 0.25,
        }
        .with_exploration(3.0);
        assert_eq!(
            policy,
            BanditPolicy::EnhancedUcb1 {
                exploration: 3.0,
                depth_decay: 0.25,
            }
        );
    }
}
