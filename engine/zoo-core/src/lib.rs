//! Core game model for the Zooscape agent.
//!
//! This crate provides the compact forward model the search engine rolls
//! games forward with:
//!
//! - grid primitives ([`Position`], [`CellContent`], [`BitBoard`])
//! - the persistent entities ([`Animal`], [`Zookeeper`])
//! - the simulator itself ([`GameState`]): movement, pellet capture,
//!   power-up effects, streak evolution, pursuer motion and capture
//!   resolution, plus the distance/threat queries the heuristics need
//!
//! The simulator is deliberately forgiving: out-of-range coordinates,
//! unknown animal ids and illegal moves all degrade to well-defined no-ops
//! so that a rollout can never fault mid-search. The only hard failure is a
//! structurally malformed state, reported by [`GameState::validate`] as a
//! [`StateError`] before any search begins.

pub mod action;
pub mod animal;
pub mod bitboard;
pub mod cell;
pub mod position;
pub mod state;

pub use action::BotAction;
pub use animal::{Animal, Zookeeper};
pub use bitboard::BitBoard;
pub use cell::{CellContent, PowerUpKind};
pub use position::Position;
pub use state::{GameState, StateError};
