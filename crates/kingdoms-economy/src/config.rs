//! Timing parameters for agents and kingdom shutdown.
//!
//! The [`EconomyConfig`] struct bundles every tunable so that callers (the
//! simulation runner, tests) can override defaults. It is deserialized
//! directly as the `economy` section of `kingdoms-config.yaml`; any field
//! left out keeps its default.

use std::time::Duration;

use serde::Deserialize;

use kingdoms_types::AgentKind;

/// Timing configuration shared by every agent in a kingdom.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Base interval for the mine, in ms (default: 2000).
    pub miner_ms: u64,

    /// Base interval for the blacksmith, in ms (default: 3000).
    pub smith_ms: u64,

    /// Base interval for the farm, in ms (default: 1500).
    pub farmer_ms: u64,

    /// Base interval for the jeweler, in ms (default: 4000).
    pub jeweler_ms: u64,

    /// Base interval for the princess, in ms (default: 2500).
    pub princess_ms: u64,

    /// Base interval for the king, in ms (default: 5000).
    pub king_ms: u64,

    /// Base interval for the army, in ms (default: 4000).
    pub army_ms: u64,

    /// Floor for any randomized inter-cycle delay, in ms (default: 500).
    pub min_delay_ms: u64,

    /// How long `Kingdom::stop` waits for each agent task, in ms
    /// (default: 1000). Not read from the `economy` section; the runner
    /// takes it from `shutdown.join_timeout_ms`.
    #[serde(skip)]
    pub join_timeout_ms: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            miner_ms: AgentKind::Miner.default_interval_ms(),
            smith_ms: AgentKind::Smith.default_interval_ms(),
            farmer_ms: AgentKind::Farmer.default_interval_ms(),
            jeweler_ms: AgentKind::Jeweler.default_interval_ms(),
            princess_ms: AgentKind::Princess.default_interval_ms(),
            king_ms: AgentKind::King.default_interval_ms(),
            army_ms: AgentKind::Army.default_interval_ms(),
            min_delay_ms: 500,
            join_timeout_ms: 1000,
        }
    }
}

impl EconomyConfig {
    /// Base production interval for an agent kind, in ms.
    pub const fn base_interval_ms(&self, kind: AgentKind) -> u64 {
        match kind {
            AgentKind::Miner => self.miner_ms,
            AgentKind::Smith => self.smith_ms,
            AgentKind::Farmer => self.farmer_ms,
            AgentKind::Jeweler => self.jeweler_ms,
            AgentKind::Princess => self.princess_ms,
            AgentKind::King => self.king_ms,
            AgentKind::Army => self.army_ms,
        }
    }

    /// Per-task join timeout used when stopping a kingdom.
    pub const fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_agent_kinds() {
        let cfg = EconomyConfig::default();
        for kind in AgentKind::ALL {
            assert_eq!(cfg.base_interval_ms(kind), kind.default_interval_ms());
        }
        assert_eq!(cfg.min_delay_ms, 500);
        assert_eq!(cfg.join_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn overrides_apply_per_kind() {
        let cfg = EconomyConfig {
            king_ms: 10,
            ..EconomyConfig::default()
        };
        assert_eq!(cfg.base_interval_ms(AgentKind::King), 10);
        assert_eq!(cfg.base_interval_ms(AgentKind::Army), 4000);
    }
}
