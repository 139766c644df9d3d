//! The war scheduler: periodic battles until one army falls.
//!
//! A [`War`] owns one tokio task that walks the phase machine
//!
//! ```text
//! Pending --grace period--> Active --army defeated--> Ended { victory }
//!    \                         \
//!     `------- stop() --------`-----> Halted
//! ```
//!
//! While active it fights a battle, checks both armies for defeat, then
//! sleeps a random 2-4 s before the next one. The phase lives in a
//! [`tokio::sync::watch`] channel so any number of callers can
//! [`War::await_end`] concurrently. A terminal phase is never overwritten,
//! so the war ends at most once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kingdoms_economy::{Dice, Kingdom, RunSignal};
use kingdoms_types::{KingdomId, Narration, NarrationSink, StrengthReading};

use crate::battle::{Belligerent, resolve_battle};
use crate::config::WarConfig;

/// Errors from the war scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WarError {
    /// `start` was called more than once.
    #[error("the war has already started")]
    AlreadyStarted,

    /// The war was stopped before either army was defeated.
    #[error("the war was halted before a victor emerged")]
    Halted,
}

/// The outcome of a war that ran to conquest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Victory {
    /// Winning kingdom.
    pub winner: KingdomId,
    /// Winning kingdom's name.
    pub winner_name: String,
    /// Defeated kingdom.
    pub loser: KingdomId,
    /// Defeated kingdom's name.
    pub loser_name: String,
    /// Battles fought, including the decisive one.
    pub battles: u64,
    /// Wall-clock time of the decisive battle.
    pub ended_at: DateTime<Utc>,
}

/// Where the war is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarPhase {
    /// Declared; waiting out the grace period.
    Pending,
    /// Battles are being fought.
    Active,
    /// An army was defeated.
    Ended(Victory),
    /// Stopped before a victor emerged.
    Halted,
}

impl WarPhase {
    /// Whether the phase can no longer change.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended(_) | Self::Halted)
    }
}

/// A war between two kingdoms.
pub struct War {
    kingdoms: [Arc<Kingdom>; 2],
    config: WarConfig,
    join_timeout: Duration,
    signal: Arc<RunSignal>,
    phase: Arc<watch::Sender<WarPhase>>,
    battles: Arc<AtomicU64>,
    dice: Mutex<Option<Box<dyn Dice>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    sink: Arc<dyn NarrationSink>,
}

impl core::fmt::Debug for War {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [first, second] = &self.kingdoms;
        f.debug_struct("War")
            .field("first", &first.name())
            .field("second", &second.name())
            .field("phase", &self.phase())
            .field("battles", &self.battles())
            .finish_non_exhaustive()
    }
}

impl War {
    /// Declare a war between `first` and `second`. Nothing runs until
    /// [`War::start`].
    ///
    /// `join_timeout` bounds how long [`War::stop`] waits for the task.
    pub fn new(
        first: Arc<Kingdom>,
        second: Arc<Kingdom>,
        config: &WarConfig,
        join_timeout: Duration,
        dice: Box<dyn Dice>,
        sink: Arc<dyn NarrationSink>,
    ) -> Self {
        let (phase, _) = watch::channel(WarPhase::Pending);
        Self {
            kingdoms: [first, second],
            config: config.clone(),
            join_timeout,
            signal: Arc::new(RunSignal::new()),
            phase: Arc::new(phase),
            battles: Arc::new(AtomicU64::new(0)),
            dice: Mutex::new(Some(dice)),
            handle: Mutex::new(None),
            sink,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> WarPhase {
        self.phase.borrow().clone()
    }

    /// Battles fought so far.
    pub fn battles(&self) -> u64 {
        self.battles.load(Ordering::Acquire)
    }

    /// Spawn the battle loop. Requires a tokio runtime.
    pub fn start(&self) -> Result<(), WarError> {
        if self.phase.borrow().is_terminal() {
            return Err(WarError::Halted);
        }
        let dice = lock(&self.dice).take().ok_or(WarError::AlreadyStarted)?;

        let [first, second] = &self.kingdoms;
        info!(first = %first.name(), second = %second.name(), "war declared");
        self.sink.record(Narration::WarDeclared {
            first: first.name().to_owned(),
            second: second.name().to_owned(),
        });

        let campaign = Campaign {
            kingdoms: self.kingdoms.clone(),
            config: self.config.clone(),
            signal: Arc::clone(&self.signal),
            phase: Arc::clone(&self.phase),
            battles: Arc::clone(&self.battles),
            dice,
            sink: Arc::clone(&self.sink),
        };
        *lock(&self.handle) = Some(tokio::spawn(campaign.run()));
        Ok(())
    }

    /// Stop the battle loop and wait (bounded) for the task to exit.
    ///
    /// A war without a victor becomes [`WarPhase::Halted`]. Stopping an
    /// ended war only joins the task.
    pub async fn stop(&self) {
        self.signal.halt();
        let halted = self.phase.send_if_modified(|phase| {
            if phase.is_terminal() {
                false
            } else {
                *phase = WarPhase::Halted;
                true
            }
        });
        if halted {
            info!(battles = self.battles(), "war halted");
        }

        let handle = lock(&self.handle).take();
        let Some(mut handle) = handle else {
            return;
        };
        if tokio::time::timeout(self.join_timeout, &mut handle).await.is_err() {
            handle.abort();
            warn!(
                timeout_ms = self.join_timeout.as_millis(),
                "war task did not exit in time; aborted"
            );
        }
    }

    /// Wait until the war reaches a terminal phase.
    ///
    /// Returns the [`Victory`] when an army was defeated, or
    /// [`WarError::Halted`] if the war was stopped first.
    pub async fn await_end(&self) -> Result<Victory, WarError> {
        let mut phase = self.phase.subscribe();
        let terminal = phase
            .wait_for(WarPhase::is_terminal)
            .await
            .map_err(|_closed| WarError::Halted)?;
        match &*terminal {
            WarPhase::Ended(victory) => Ok(victory.clone()),
            WarPhase::Pending | WarPhase::Active | WarPhase::Halted => Err(WarError::Halted),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the battle task owns.
struct Campaign {
    kingdoms: [Arc<Kingdom>; 2],
    config: WarConfig,
    signal: Arc<RunSignal>,
    phase: Arc<watch::Sender<WarPhase>>,
    battles: Arc<AtomicU64>,
    dice: Box<dyn Dice>,
    sink: Arc<dyn NarrationSink>,
}

impl Campaign {
    async fn run(mut self) {
        if !self.signal.sleep(self.config.grace_period()).await {
            debug!("war stopped during the grace period");
            return;
        }

        let activated = self.phase.send_if_modified(|phase| {
            if *phase == WarPhase::Pending {
                *phase = WarPhase::Active;
                true
            } else {
                false
            }
        });
        if !activated {
            return;
        }
        info!("war active; battles begin");

        while self.signal.is_active() {
            let battle = self.battles.fetch_add(1, Ordering::AcqRel).saturating_add(1);
            self.fight(battle);

            if let Some(victory) = self.victory(battle) {
                let [first, second] = &self.kingdoms;
                let ended = self.phase.send_if_modified(|phase| {
                    if phase.is_terminal() {
                        false
                    } else {
                        *phase = WarPhase::Ended(victory.clone());
                        true
                    }
                });
                if ended {
                    info!(
                        winner = %victory.winner_name,
                        loser = %victory.loser_name,
                        battles = battle,
                        first_combat = first.combat_strength(),
                        second_combat = second.combat_strength(),
                        "war ended"
                    );
                    self.sink.record(Narration::WarEnded {
                        winner: victory.winner_name,
                    });
                }
                return;
            }

            let pause = self.next_interval();
            if !self.signal.sleep(pause).await {
                return;
            }
        }
    }

    fn fight(&mut self, battle: u64) {
        let [first, second] = &self.kingdoms;
        let belligerents = [Belligerent::of(first), Belligerent::of(second)];
        let [first_view, second_view] = &belligerents;

        self.sink.record(Narration::BattleReport {
            battle,
            first: reading(first_view),
            second: reading(second_view),
        });
        let report = resolve_battle(&belligerents, self.dice.as_mut(), self.sink.as_ref());
        debug!(battle, outcome = ?report.outcome, adjusted = ?report.adjusted, "battle resolved");
    }

    fn victory(&self, battles: u64) -> Option<Victory> {
        let [first, second] = &self.kingdoms;
        let (winner, loser) = if first.army().is_defeated() {
            (second, first)
        } else if second.army().is_defeated() {
            (first, second)
        } else {
            return None;
        };
        Some(Victory {
            winner: winner.id(),
            winner_name: winner.name().to_owned(),
            loser: loser.id(),
            loser_name: loser.name().to_owned(),
            battles,
            ended_at: Utc::now(),
        })
    }

    fn next_interval(&mut self) -> Duration {
        let low = u32::try_from(self.config.battle_interval_min_ms).unwrap_or(u32::MAX);
        let high = u32::try_from(self.config.battle_interval_max_ms).unwrap_or(u32::MAX);
        Duration::from_millis(u64::from(self.dice.roll(low, high)))
    }
}

fn reading(belligerent: &Belligerent<'_>) -> StrengthReading {
    StrengthReading {
        kingdom: belligerent.name.to_owned(),
        combat_strength: belligerent.combat_strength,
        army_strength: belligerent.army.strength(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdoms_economy::{EconomyConfig, MidpointDice};
    use kingdoms_types::{Actor, AgentKind, RecordingSink, Resource, SilentSink};

    use super::*;

    /// An idle kingdom whose army has been drilled `drills` times at
    /// midpoint rolls (+5 strength each).
    async fn drilled_kingdom(name: &str, drills: u32) -> Arc<Kingdom> {
        let kingdom = Kingdom::with_dice(
            name,
            &EconomyConfig::default(),
            Arc::new(SilentSink),
            |_| -> Box<dyn Dice> { Box::new(MidpointDice) },
        );
        let quartermaster = Actor::new(name, AgentKind::Smith);
        kingdom.counter(Resource::Weapons).produce(drills, &quartermaster);
        kingdom.counter(Resource::Food).produce(drills.saturating_mul(3), &quartermaster);
        kingdom.counter(Resource::Tactics).produce(drills, &quartermaster);
        for _ in 0..drills {
            kingdom.step(AgentKind::Army).await.unwrap();
        }
        Arc::new(kingdom)
    }

    fn war(first: &Arc<Kingdom>, second: &Arc<Kingdom>, sink: Arc<dyn NarrationSink>) -> War {
        War::new(
            Arc::clone(first),
            Arc::clone(second),
            &WarConfig::default(),
            Duration::from_secs(1),
            Box::new(MidpointDice),
            sink,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn stronger_kingdom_wins_first_battle() {
        let first = drilled_kingdom("Kingdom 1", 20).await;
        let second = drilled_kingdom("Kingdom 2", 10).await;
        assert_eq!(first.combat_strength(), 100);
        assert_eq!(second.combat_strength(), 50);

        let sink = Arc::new(RecordingSink::new());
        let war = war(&first, &second, sink.clone());
        war.start().unwrap();
        assert_eq!(war.phase(), WarPhase::Pending);

        let victory = war.await_end().await.unwrap();
        assert_eq!(victory.winner, first.id());
        assert_eq!(victory.winner_name, "Kingdom 1");
        assert_eq!(victory.loser, second.id());
        assert_eq!(victory.battles, 1);

        // Damage 25 + roll(0, 12) = 31 from the midpoint dice.
        assert!(second.army().is_defeated());
        assert_eq!(second.army().strength(), 19);
        assert_eq!(second.combat_strength(), 50);
        assert!(!first.army().is_defeated());

        assert!(matches!(war.phase(), WarPhase::Ended(_)));
        assert_eq!(
            sink.count(|e| matches!(e, Narration::WarEnded { winner } if winner == "Kingdom 1")),
            1
        );
        war.stop().await;
        assert!(matches!(war.phase(), WarPhase::Ended(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn no_battle_before_grace_period() {
        let first = drilled_kingdom("Kingdom 1", 20).await;
        let second = drilled_kingdom("Kingdom 2", 10).await;
        let war = war(&first, &second, Arc::new(SilentSink));
        war.start().unwrap();

        tokio::time::sleep(Duration::from_millis(17_900)).await;
        assert_eq!(war.battles(), 0);
        assert_eq!(war.phase(), WarPhase::Pending);
        assert_eq!(second.army().strength(), 50);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(war.battles(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalemated_war_can_be_halted() {
        let first = drilled_kingdom("Kingdom 1", 0).await;
        let second = drilled_kingdom("Kingdom 2", 0).await;
        let sink = Arc::new(RecordingSink::new());
        let war = Arc::new(war(&first, &second, sink.clone()));
        war.start().unwrap();

        let waiter = {
            let war = Arc::clone(&war);
            tokio::spawn(async move { war.await_end().await })
        };

        // Battles at 18.000 s, 20.999 s, 23.998 s, ...
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(war.phase(), WarPhase::Active);
        assert_eq!(war.battles(), 3);
        war.stop().await;

        assert_eq!(waiter.await.unwrap(), Err(WarError::Halted));
        assert_eq!(war.phase(), WarPhase::Halted);
        assert_eq!(war.await_end().await, Err(WarError::Halted));
        assert_eq!(sink.count(|e| *e == Narration::Stalemate), 3);
        assert_eq!(sink.count(|e| matches!(e, Narration::WarEnded { .. })), 0);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let first = drilled_kingdom("Kingdom 1", 0).await;
        let second = drilled_kingdom("Kingdom 2", 0).await;
        let war = war(&first, &second, Arc::new(SilentSink));

        war.start().unwrap();
        assert_eq!(war.start(), Err(WarError::AlreadyStarted));
        war.stop().await;
        assert_eq!(war.start(), Err(WarError::Halted));
    }

    #[tokio::test]
    async fn stop_before_start_halts() {
        let first = drilled_kingdom("Kingdom 1", 0).await;
        let second = drilled_kingdom("Kingdom 2", 0).await;
        let war = war(&first, &second, Arc::new(SilentSink));

        war.stop().await;
        assert_eq!(war.phase(), WarPhase::Halted);
        assert_eq!(war.await_end().await, Err(WarError::Halted));
    }
}
