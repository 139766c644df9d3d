//! Shared type definitions for the Kingdoms simulation.
//!
//! This crate is the vocabulary every other crate in the workspace speaks:
//! which resources exist, which agents work them, which side of a battle a
//! value belongs to, and the narration events that describe it all.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for kingdom identifiers
//! - [`enums`] -- Resources, agent kinds, production flavour, battle sides
//! - [`narration`] -- Narration events and the [`NarrationSink`] trait

pub mod enums;
pub mod ids;
pub mod narration;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentKind, BattleSide, Conditions, HarvestQuality, Mood, Resource, Strategy};
pub use ids::KingdomId;
pub use narration::{Actor, Narration, NarrationSink, RecordingSink, SilentSink, StrengthReading};
