//! Monte-Carlo Tree Search for the Zooscape agent.
//!
//! The engine plans one tick under a hard wall-clock budget. Each search
//! runs the classic four phases:
//!
//! 1. **Selection**: descend the shared tree with a bandit policy
//!    ([`BanditPolicy`]), shaded by progressive bias and AMAF statistics
//! 2. **Expansion**: add one untried child under the node's expansion
//!    lock, consulting the transposition table for known positions
//! 3. **Simulation**: roll the simulator forward with a fast greedy
//!    policy, accumulating a discounted shaped reward
//! 4. **Backpropagation**: push the normalised reward up the path,
//!    updating RAVE and AMAF statistics and releasing virtual losses
//!
//! Searches are parallel: `worker_count` threads iterate on one shared
//! tree, coordinated only through atomic statistics, per-node expansion
//! locks and virtual losses. A single atomic stop flag cancels the search
//! cooperatively; every path out of the engine produces a valid action.
//!
//! [`BotService`] is the facade the transport adapter talks to: it owns an
//! engine and the registered bot id, and returns the chosen action together
//! with per-action visit statistics.

mod amaf;
mod atomic;
mod bandit;
mod config;
mod node;
mod rollout;
mod search;
mod service;
mod transposition;

pub use amaf::AmafTable;
pub use bandit::BanditPolicy;
pub use config::MctsConfig;
pub use node::{MctsNode, TreeStats};
pub use search::{ActionStats, MctsEngine, MctsResult, SearchError};
pub use service::BotService;
pub use transposition::TranspositionTable;
