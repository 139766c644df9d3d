//! Narration events and the sink they are written to.
//!
//! Every produce, consume-wait, consume-success, battle report and defeat
//! announcement is emitted as a [`Narration`] value. The exact wording is
//! not part of the contract; the structured payload is. [`Narration`]
//! implements [`Display`](core::fmt::Display) with a human-readable line,
//! which console sinks can use as the message.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::enums::{AgentKind, Conditions, HarvestQuality, Mood, Resource};

/// The agent an event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Name of the kingdom the agent works for.
    pub kingdom: String,
    /// What the agent does.
    pub kind: AgentKind,
}

impl Actor {
    /// Build an actor label for an agent of `kind` in `kingdom`.
    pub fn new(kingdom: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            kingdom: kingdom.into(),
            kind,
        }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.kingdom, self.kind.role())
    }
}

/// A kingdom's strength as read at the start of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthReading {
    /// Kingdom name.
    pub kingdom: String,
    /// Aggregate combat strength (never decreases).
    pub combat_strength: u32,
    /// The army's own, damageable strength.
    pub army_strength: u32,
}

/// One narrated happening in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Narration {
    /// A kingdom's agents were started.
    KingdomStarted {
        /// Kingdom name.
        kingdom: String,
    },
    /// A kingdom's agents were told to stop and joined.
    KingdomStopped {
        /// Kingdom name.
        kingdom: String,
        /// Tasks that exited within the join timeout.
        exited: usize,
        /// Tasks that had to be aborted.
        timed_out: usize,
    },
    /// An agent added to a counter.
    Produced {
        /// The producer.
        actor: Actor,
        /// Counter produced into.
        resource: Resource,
        /// Units added.
        count: u32,
        /// Counter total after the produce.
        total: u32,
    },
    /// An agent found a counter short and is waiting for more.
    AwaitingResource {
        /// The waiting consumer.
        actor: Actor,
        /// Counter being waited on.
        resource: Resource,
        /// Units the consumer needs.
        wanted: u32,
        /// Units available when the consumer looked.
        available: u32,
    },
    /// An agent took from a counter.
    Consumed {
        /// The consumer.
        actor: Actor,
        /// Counter consumed from.
        resource: Resource,
        /// Units removed.
        count: u32,
        /// Counter total after the consume.
        remaining: u32,
    },
    /// A farm had a notably poor or bumper harvest.
    Harvest {
        /// The farm.
        actor: Actor,
        /// How the harvest turned out.
        quality: HarvestQuality,
        /// Food produced.
        amount: u32,
    },
    /// A jeweler spent extra ore on high-quality work.
    MasterworkJewelry {
        /// The jeweler.
        actor: Actor,
        /// Pieces of jewelry made.
        pieces: u32,
    },
    /// The princess was in a notably poor or excellent mood.
    PrincessMood {
        /// The princess.
        actor: Actor,
        /// Her mood.
        mood: Mood,
        /// Happiness produced.
        happiness: u32,
    },
    /// A king had a brilliant strategic insight.
    BrilliantStrategy {
        /// The king.
        actor: Actor,
    },
    /// An army trained at more than 110% effectiveness.
    ExcellentTraining {
        /// The army.
        actor: Actor,
    },
    /// An army completed a training cycle.
    ArmyStrengthened {
        /// The army.
        actor: Actor,
        /// Strength gained this cycle.
        increase: u32,
        /// Army strength after the gain.
        strength: u32,
    },
    /// The war between two kingdoms was declared.
    WarDeclared {
        /// First kingdom.
        first: String,
        /// Second kingdom.
        second: String,
    },
    /// Strength readings at the start of a battle.
    BattleReport {
        /// Battle number, starting at 1.
        battle: u64,
        /// First kingdom's readings.
        first: StrengthReading,
        /// Second kingdom's readings.
        second: StrengthReading,
    },
    /// A kingdom's battle factor was notably high or low.
    BattleConditions {
        /// Kingdom name.
        kingdom: String,
        /// Favorable or unfavorable.
        conditions: Conditions,
        /// Battle factor in per mille (1000 = 100%).
        factor_permille: u32,
    },
    /// A kingdom won a battle outright.
    BattleWon {
        /// The winner of the battle.
        victor: String,
        /// Damage dealt to the loser's army.
        damage: u32,
    },
    /// An army lost strength.
    ArmyWeakened {
        /// Kingdom whose army was hit.
        kingdom: String,
        /// Army strength after the hit.
        strength: u32,
    },
    /// A losing army suffered a critical defeat.
    CriticalDefeat {
        /// Kingdom name.
        kingdom: String,
    },
    /// An army was defeated. This ends the war.
    ArmyDefeated {
        /// Kingdom name.
        kingdom: String,
    },
    /// An evenly matched battle was tipped by a small advantage.
    DrawAdvantage {
        /// The advantaged kingdom.
        kingdom: String,
        /// Damage dealt to the other army.
        damage: u32,
    },
    /// An evenly matched battle with no effect.
    Stalemate,
    /// The war ended with a winner.
    WarEnded {
        /// Winning kingdom.
        winner: String,
    },
    /// The whole simulation wound down.
    SimulationEnded,
}

impl Narration {
    /// Name of the kingdom this event concerns, when there is exactly one.
    pub fn kingdom(&self) -> Option<&str> {
        match self {
            Self::KingdomStarted { kingdom }
            | Self::KingdomStopped { kingdom, .. }
            | Self::BattleConditions { kingdom, .. }
            | Self::ArmyWeakened { kingdom, .. }
            | Self::CriticalDefeat { kingdom }
            | Self::ArmyDefeated { kingdom }
            | Self::DrawAdvantage { kingdom, .. } => Some(kingdom),
            Self::Produced { actor, .. }
            | Self::AwaitingResource { actor, .. }
            | Self::Consumed { actor, .. }
            | Self::Harvest { actor, .. }
            | Self::MasterworkJewelry { actor, .. }
            | Self::PrincessMood { actor, .. }
            | Self::BrilliantStrategy { actor }
            | Self::ExcellentTraining { actor }
            | Self::ArmyStrengthened { actor, .. } => Some(&actor.kingdom),
            Self::BattleWon { victor, .. } => Some(victor),
            Self::WarEnded { winner } => Some(winner),
            Self::WarDeclared { .. }
            | Self::BattleReport { .. }
            | Self::Stalemate
            | Self::SimulationEnded => None,
        }
    }
}

impl core::fmt::Display for Narration {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::KingdomStarted { kingdom } => write!(f, "{kingdom} simulation started."),
            Self::KingdomStopped {
                kingdom,
                exited,
                timed_out,
            } => write!(
                f,
                "{kingdom} simulation stopped ({exited} agents exited, {timed_out} aborted)."
            ),
            Self::Produced {
                actor,
                resource,
                count,
                total,
            } => write!(f, "{actor} produced {count} {resource}. Total: {total}"),
            Self::AwaitingResource {
                actor,
                resource,
                wanted,
                available,
            } => write!(
                f,
                "{actor} is waiting for {wanted} {resource}. Available: {available}"
            ),
            Self::Consumed {
                actor,
                resource,
                count,
                remaining,
            } => write!(f, "{actor} consumed {count} {resource}. Remaining: {remaining}"),
            Self::Harvest {
                actor,
                quality,
                amount,
            } => match quality {
                HarvestQuality::Poor => {
                    write!(f, "{actor} experienced a poor harvest! ({amount} food)")
                }
                HarvestQuality::Bumper => {
                    write!(f, "{actor} experienced a bumper crop! ({amount} food)")
                }
                HarvestQuality::Normal => write!(f, "{actor} harvested {amount} food."),
            },
            Self::MasterworkJewelry { actor, pieces } => {
                write!(f, "{actor} created high-quality jewelry! ({pieces} pieces)")
            }
            Self::PrincessMood { actor, mood, .. } => match mood {
                Mood::Excellent => write!(f, "{actor} is in an excellent mood today!"),
                Mood::Poor => write!(f, "{actor} is in a poor mood today."),
                Mood::Fair => write!(f, "{actor} is in a fair mood today."),
            },
            Self::BrilliantStrategy { actor } => {
                write!(f, "{actor} had a brilliant strategic insight!")
            }
            Self::ExcellentTraining { actor } => {
                write!(f, "{actor} had an excellent training session!")
            }
            Self::ArmyStrengthened {
                actor,
                increase,
                strength,
            } => write!(f, "{actor} increased strength by {increase} to {strength}"),
            Self::WarDeclared { first, second } => {
                write!(f, "WAR STARTED between {first} and {second}")
            }
            Self::BattleReport {
                battle,
                first,
                second,
            } => write!(
                f,
                "BATTLE REPORT #{battle}: {} combat strength: {} (Army strength: {}); \
                 {} combat strength: {} (Army strength: {})",
                first.kingdom,
                first.combat_strength,
                first.army_strength,
                second.kingdom,
                second.combat_strength,
                second.army_strength,
            ),
            Self::BattleConditions {
                kingdom,
                conditions,
                factor_permille,
            } => {
                let (label, sign, deviation) = match conditions {
                    Conditions::Favorable => {
                        ("favorable", '+', factor_permille.saturating_sub(1000))
                    }
                    Conditions::Unfavorable => {
                        ("unfavorable", '-', 1000_u32.saturating_sub(*factor_permille))
                    }
                };
                write!(
                    f,
                    "{kingdom} has {label} battle conditions! ({sign}{}.{}%)",
                    deviation / 10,
                    deviation % 10
                )
            }
            Self::BattleWon { victor, damage } => {
                write!(f, "{victor} won the battle and dealt {damage} damage!")
            }
            Self::ArmyWeakened { kingdom, strength } => {
                write!(f, "{kingdom} army strength reduced to: {strength}")
            }
            Self::CriticalDefeat { kingdom } => write!(f, "{kingdom} suffered a CRITICAL DEFEAT!"),
            Self::ArmyDefeated { kingdom } => write!(f, "{kingdom} ARMY HAS BEEN DEFEATED!"),
            Self::DrawAdvantage { kingdom, damage } => write!(
                f,
                "Though evenly matched, {kingdom} gained a slight advantage in the draw! \
                 ({damage} damage)"
            ),
            Self::Stalemate => f.write_str(
                "The battle ended in a draw! Both armies remain at their current strength.",
            ),
            Self::WarEnded { winner } => write!(f, "WAR ENDED! {winner} has WON THE WAR!"),
            Self::SimulationEnded => f.write_str("Simulation ended."),
        }
    }
}

/// Destination for narration events.
///
/// Sinks are shared by every agent task and the war scheduler, so they
/// must be callable concurrently.
pub trait NarrationSink: Send + Sync {
    /// Record one event.
    fn record(&self, narration: Narration);
}

/// A sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl NarrationSink for SilentSink {
    fn record(&self, _narration: Narration) {}
}

/// A sink that keeps every event in memory, in arrival order.
///
/// Used by tests and by callers that want to inspect what happened after a
/// run.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Narration>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<Narration> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Narration) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NarrationSink for RecordingSink {
    fn record(&self, narration: Narration) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(narration);
    }
}
