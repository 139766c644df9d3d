//! Enumeration types for the Kingdoms simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// One of the eight resource counters every kingdom owns.
///
/// Resources form a fixed dependency chain:
///
/// ```text
/// Mine -> coal, ore
/// ore  -> Blacksmith -> metal -> weapons
/// ore  -> Jeweler    -> jewelry -> Princess -> happiness -> King -> tactics
/// Farm -> food
/// weapons + food + tactics -> Army
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Dug by the mine. Nothing consumes it.
    Coal,
    /// Dug by the mine, worked by the blacksmith and the jeweler.
    Ore,
    /// Smelted by the blacksmith from ore.
    Metal,
    /// Forged by the blacksmith from metal.
    Weapons,
    /// Crafted by the jeweler from ore.
    Jewelry,
    /// Harvested by the farm.
    Food,
    /// The princess's delight, earned with jewelry.
    Happiness,
    /// Strategies drawn up by the king from happiness.
    Tactics,
}

impl Resource {
    /// Every resource, in counter order.
    pub const ALL: [Self; 8] = [
        Self::Coal,
        Self::Ore,
        Self::Metal,
        Self::Weapons,
        Self::Jewelry,
        Self::Food,
        Self::Happiness,
        Self::Tactics,
    ];

    /// Human-readable counter name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Coal => "Coal",
            Self::Ore => "Ore",
            Self::Metal => "Metal",
            Self::Weapons => "Weapons",
            Self::Jewelry => "Jewelry",
            Self::Food => "Food",
            Self::Happiness => "Happiness",
            Self::Tactics => "Tactics",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// The seven kinds of autonomous agent working inside a kingdom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Produces coal and ore from nothing.
    Miner,
    /// Turns ore into metal and, usually, weapons.
    Smith,
    /// Produces food from nothing.
    Farmer,
    /// Turns ore into jewelry.
    Jeweler,
    /// Turns jewelry into happiness.
    Princess,
    /// Turns happiness into tactics.
    King,
    /// Turns weapons, food and tactics into military strength.
    Army,
}

impl AgentKind {
    /// Every agent kind, in the order a kingdom spawns them.
    pub const ALL: [Self; 7] = [
        Self::Miner,
        Self::Smith,
        Self::Farmer,
        Self::Jeweler,
        Self::Princess,
        Self::King,
        Self::Army,
    ];

    /// The role name used when narrating, e.g. `"Kingdom 1 Blacksmith"`.
    pub const fn role(self) -> &'static str {
        match self {
            Self::Miner => "Mine",
            Self::Smith => "Blacksmith",
            Self::Farmer => "Farm",
            Self::Jeweler => "Jeweler",
            Self::Princess => "Princess",
            Self::King => "King",
            Self::Army => "Army",
        }
    }

    /// Default base interval between production cycles, in milliseconds.
    pub const fn default_interval_ms(self) -> u64 {
        match self {
            Self::Miner => 2000,
            Self::Smith => 3000,
            Self::Farmer => 1500,
            Self::Jeweler | Self::Army => 4000,
            Self::Princess => 2500,
            Self::King => 5000,
        }
    }
}

impl core::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.role())
    }
}

// ---------------------------------------------------------------------------
// Production flavour
// ---------------------------------------------------------------------------

/// How a farm's harvest turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestQuality {
    /// Half the base yield (at least one).
    Poor,
    /// The base yield.
    Normal,
    /// Double the base yield.
    Bumper,
}

/// The princess's mood on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Mood factor 1.
    Poor,
    /// Mood factor 2 to 4.
    Fair,
    /// Mood factor 5.
    Excellent,
}

/// Quality of the strategy a king drew up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One tactic.
    Basic,
    /// Two tactics.
    Standard,
    /// Three tactics.
    Brilliant,
}

impl Strategy {
    /// Number of tactics this strategy produces.
    pub const fn tactics(self) -> u32 {
        match self {
            Self::Basic => 1,
            Self::Standard => 2,
            Self::Brilliant => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// War
// ---------------------------------------------------------------------------

/// Which of the two warring kingdoms a battle value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleSide {
    /// The kingdom listed first when the war was declared.
    First,
    /// The kingdom listed second when the war was declared.
    Second,
}

impl BattleSide {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Whether the terrain and luck of a battle favoured a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conditions {
    /// Battle factor above 1.1.
    Favorable,
    /// Battle factor below 0.9.
    Unfavorable,
}
