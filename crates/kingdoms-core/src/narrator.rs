//! Narration rendered as `tracing` events.
//!
//! Counter traffic (produce, consume, waits) is frequent and goes out at
//! `debug`. Everything else, from harvests to the end of the war, goes out
//! at `info`. Every event carries the kingdom it concerns when there is
//! one, and the human-readable line as its message.

use tracing::{debug, info};

use kingdoms_types::{Narration, NarrationSink};

/// A [`NarrationSink`] that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NarrationSink for TracingSink {
    fn record(&self, narration: Narration) {
        let kingdom = narration.kingdom().unwrap_or_default();
        match &narration {
            Narration::Produced {
                actor,
                resource,
                count,
                total,
            } => debug!(
                kingdom,
                agent = %actor.kind,
                %resource,
                count,
                total,
                "{narration}"
            ),
            Narration::Consumed {
                actor,
                resource,
                count,
                remaining,
            } => debug!(
                kingdom,
                agent = %actor.kind,
                %resource,
                count,
                remaining,
                "{narration}"
            ),
            Narration::AwaitingResource {
                actor,
                resource,
                wanted,
                available,
            } => debug!(
                kingdom,
                agent = %actor.kind,
                %resource,
                wanted,
                available,
                "{narration}"
            ),
            Narration::ArmyStrengthened {
                increase, strength, ..
            } => info!(kingdom, increase, strength, "{narration}"),
            Narration::BattleReport { battle, .. } => info!(battle, "{narration}"),
            Narration::BattleWon { damage, .. } => info!(kingdom, damage, "{narration}"),
            Narration::ArmyWeakened { strength, .. } => info!(kingdom, strength, "{narration}"),
            _ => info!(kingdom, "{narration}"),
        }
    }
}
