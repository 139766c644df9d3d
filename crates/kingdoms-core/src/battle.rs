//! Battle resolution between two kingdoms.
//!
//! A battle compares the kingdoms' combat strengths after each is scaled by
//! an independent random factor in `[0.8, 1.2]`:
//!
//! - **Clear winner**: `base = (winner - loser) / 2`, damage is
//!   `base + roll(0, base / 2)`. The loser's army takes the damage (floored
//!   at zero) and is defeated if the damage exceeds 20, its strength reaches
//!   zero, or a critical roll lands while its strength is under 15.
//! - **Tie**: 30% of the time one side (chosen by coin) deals 1-5 damage with
//!   no defeat check. Otherwise nothing happens.
//!
//! The critical chance depends on which side won: 15% when the first
//! kingdom wins, 10% when the second does.
//!
//! Damage only ever touches the army's own strength. Combat strength is
//! read, never written.

use std::cmp::Ordering;

use kingdoms_economy::ArmyState;
use kingdoms_economy::Kingdom;
use kingdoms_economy::dice::{Dice, Factor, chance, coin};
use kingdoms_types::{BattleSide, Narration, NarrationSink};

/// Critical-defeat chance when the first kingdom wins (15%).
pub const FIRST_WINS_CRITICAL_BP: u32 = 1500;

/// Critical-defeat chance when the second kingdom wins (10%).
pub const SECOND_WINS_CRITICAL_BP: u32 = 1000;

/// Chance an evenly matched battle is tipped (30%).
pub const TIE_BREAK_BP: u32 = 3000;

/// Damage above this defeats the losing army outright.
pub const DEFEAT_DAMAGE_THRESHOLD: u32 = 20;

/// A critical defeat only lands on armies weaker than this.
pub const CRITICAL_STRENGTH_THRESHOLD: u32 = 15;

/// One side of a battle: a name, a combat-strength reading, and the army
/// that absorbs damage.
#[derive(Debug, Clone, Copy)]
pub struct Belligerent<'a> {
    /// Kingdom name.
    pub name: &'a str,
    /// Combat strength at the time of the battle.
    pub combat_strength: u32,
    /// The army damage is applied to.
    pub army: &'a ArmyState,
}

impl<'a> Belligerent<'a> {
    /// Read a kingdom's current combat strength and borrow its army.
    pub fn of(kingdom: &'a Kingdom) -> Self {
        Self {
            name: kingdom.name(),
            combat_strength: kingdom.combat_strength(),
            army: kingdom.army(),
        }
    }
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    /// One side had the higher adjusted strength.
    Victory {
        /// The winning side.
        victor: BattleSide,
        /// Damage dealt to the loser's army.
        damage: u32,
        /// Whether the critical roll landed.
        critical: bool,
        /// Loser's army strength after the damage.
        loser_strength: u32,
        /// Whether this battle defeated the loser's army.
        defeated: bool,
    },
    /// A tie broken in one side's favour.
    TieBroken {
        /// The side that gained the advantage.
        advantaged: BattleSide,
        /// Damage dealt to the other army.
        damage: u32,
        /// The other army's strength after the damage.
        loser_strength: u32,
    },
    /// A tie with no effect.
    Stalemate,
}

/// Everything a battle drew and decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleReport {
    /// Battle factors, first then second.
    pub factors: [Factor; 2],
    /// Combat strengths after applying the factors.
    pub adjusted: [u32; 2],
    /// The decision.
    pub outcome: BattleOutcome,
}

impl BattleReport {
    /// The side this battle defeated, if any.
    pub const fn defeated(&self) -> Option<BattleSide> {
        match self.outcome {
            BattleOutcome::Victory {
                victor,
                defeated: true,
                ..
            } => Some(victor.opponent()),
            BattleOutcome::Victory { .. }
            | BattleOutcome::TieBroken { .. }
            | BattleOutcome::Stalemate => None,
        }
    }
}

/// Fight one battle between `belligerents` and apply its damage.
///
/// Rolls, in order: first factor, second factor, then either damage extra
/// and critical (clear winner) or tie-break, side and damage (tie).
pub fn resolve_battle(
    belligerents: &[Belligerent<'_>; 2],
    dice: &mut dyn Dice,
    sink: &dyn NarrationSink,
) -> BattleReport {
    let [first, second] = belligerents;

    let factors = [Factor::draw(dice), Factor::draw(dice)];
    let [first_factor, second_factor] = factors;
    let adjusted = [
        first_factor.apply(first.combat_strength),
        second_factor.apply(second.combat_strength),
    ];
    let [first_adjusted, second_adjusted] = adjusted;

    for (belligerent, factor) in [(first, first_factor), (second, second_factor)] {
        if let Some(conditions) = factor.conditions() {
            sink.record(Narration::BattleConditions {
                kingdom: belligerent.name.to_owned(),
                conditions,
                factor_permille: factor.permille(),
            });
        }
    }

    let outcome = match first_adjusted.cmp(&second_adjusted) {
        Ordering::Greater => strike(
            BattleSide::First,
            [first, second],
            [first_adjusted, second_adjusted],
            FIRST_WINS_CRITICAL_BP,
            dice,
            sink,
        ),
        Ordering::Less => strike(
            BattleSide::Second,
            [second, first],
            [second_adjusted, first_adjusted],
            SECOND_WINS_CRITICAL_BP,
            dice,
            sink,
        ),
        Ordering::Equal => break_tie([first, second], dice, sink),
    };

    BattleReport {
        factors,
        adjusted,
        outcome,
    }
}

fn strike(
    victor: BattleSide,
    [winner, loser]: [&Belligerent<'_>; 2],
    [winning, losing]: [u32; 2],
    critical_bp: u32,
    dice: &mut dyn Dice,
    sink: &dyn NarrationSink,
) -> BattleOutcome {
    let base = winning.saturating_sub(losing) / 2;
    let damage = base.saturating_add(dice.roll(0, base / 2));
    sink.record(Narration::BattleWon {
        victor: winner.name.to_owned(),
        damage,
    });

    let loser_strength = loser.army.reduce(damage);
    sink.record(Narration::ArmyWeakened {
        kingdom: loser.name.to_owned(),
        strength: loser_strength,
    });

    let critical = chance(dice, critical_bp);
    let defeated = damage > DEFEAT_DAMAGE_THRESHOLD
        || loser_strength == 0
        || (critical && loser_strength < CRITICAL_STRENGTH_THRESHOLD);

    if defeated {
        loser.army.mark_defeated();
        if critical {
            sink.record(Narration::CriticalDefeat {
                kingdom: loser.name.to_owned(),
            });
        }
        sink.record(Narration::ArmyDefeated {
            kingdom: loser.name.to_owned(),
        });
    }

    BattleOutcome::Victory {
        victor,
        damage,
        critical,
        loser_strength,
        defeated,
    }
}

fn break_tie(
    [first, second]: [&Belligerent<'_>; 2],
    dice: &mut dyn Dice,
    sink: &dyn NarrationSink,
) -> BattleOutcome {
    if !chance(dice, TIE_BREAK_BP) {
        sink.record(Narration::Stalemate);
        return BattleOutcome::Stalemate;
    }

    // Coin shows 0: the first kingdom gets the edge.
    let (advantaged, favoured, hit) = if coin(dice) {
        (BattleSide::Second, second, first)
    } else {
        (BattleSide::First, first, second)
    };
    let damage = dice.roll(1, 5);
    sink.record(Narration::DrawAdvantage {
        kingdom: favoured.name.to_owned(),
        damage,
    });

    let loser_strength = hit.army.reduce(damage);
    sink.record(Narration::ArmyWeakened {
        kingdom: hit.name.to_owned(),
        strength: loser_strength,
    });

    BattleOutcome::TieBroken {
        advantaged,
        damage,
        loser_strength,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::panic)]
mod tests {
    use kingdoms_economy::dice::{MidpointDice, ScriptedDice, SeededDice};
    use kingdoms_types::{Conditions, RecordingSink, SilentSink};
    use proptest::prelude::*;

    use super::*;

    fn fight(
        combat: [u32; 2],
        armies: [&ArmyState; 2],
        dice: &mut dyn Dice,
        sink: &dyn NarrationSink,
    ) -> BattleReport {
        let [first_army, second_army] = armies;
        let [first_combat, second_combat] = combat;
        let belligerents = [
            Belligerent {
                name: "Kingdom 1",
                combat_strength: first_combat,
                army: first_army,
            },
            Belligerent {
                name: "Kingdom 2",
                combat_strength: second_combat,
                army: second_army,
            },
        ];
        resolve_battle(&belligerents, dice, sink)
    }

    #[test]
    fn large_margin_defeats_loser() {
        let first = ArmyState::with_strength(100);
        let second = ArmyState::with_strength(200);
        let sink = RecordingSink::new();

        // Factors 1.0, extra roll(0, 12) = 6, critical roll 4999.
        let report = fight([100, 50], [&first, &second], &mut MidpointDice, &sink);

        assert_eq!(report.adjusted, [100, 50]);
        assert_eq!(
            report.outcome,
            BattleOutcome::Victory {
                victor: BattleSide::First,
                damage: 31,
                critical: false,
                loser_strength: 169,
                defeated: true,
            }
        );
        assert_eq!(report.defeated(), Some(BattleSide::Second));
        assert!(second.is_defeated());
        assert!(!first.is_defeated());
        assert_eq!(first.strength(), 100);
        assert_eq!(
            sink.count(|e| matches!(e, Narration::ArmyDefeated { kingdom } if kingdom == "Kingdom 2")),
            1
        );
        assert_eq!(sink.count(|e| matches!(e, Narration::CriticalDefeat { .. })), 0);
    }

    #[test]
    fn damage_spans_base_to_base_and_a_half() {
        for extra in 0..=12 {
            let first = ArmyState::with_strength(10);
            let second = ArmyState::with_strength(10);
            let mut dice = ScriptedDice::new([1000, 1000, extra, 9999]);
            let report = fight([100, 50], [&first, &second], &mut dice, &SilentSink);

            let BattleOutcome::Victory { damage, defeated, .. } = report.outcome else {
                panic!("expected a victory, got {report:?}");
            };
            assert_eq!(damage, 25 + extra);
            assert!(defeated);
            assert_eq!(second.strength(), 0);
        }
    }

    #[test]
    fn critical_threshold_depends_on_winning_side() {
        // Adjusted 20 vs 10: base 5, extra 0, damage 5. The loser is left
        // on 7, below the critical threshold. Critical roll 1200 lands
        // under 15% but not under 10%.
        let winner = ArmyState::with_strength(50);
        let loser = ArmyState::with_strength(12);
        let sink = RecordingSink::new();
        let mut dice = ScriptedDice::new([1000, 1000, 0, 1200]);
        let report = fight([20, 10], [&winner, &loser], &mut dice, &sink);
        assert!(matches!(
            report.outcome,
            BattleOutcome::Victory {
                victor: BattleSide::First,
                damage: 5,
                critical: true,
                loser_strength: 7,
                defeated: true,
            }
        ));
        assert_eq!(sink.count(|e| matches!(e, Narration::CriticalDefeat { .. })), 1);

        let loser = ArmyState::with_strength(12);
        let winner = ArmyState::with_strength(50);
        let mut dice = ScriptedDice::new([1000, 1000, 0, 1200]);
        let report = fight([10, 20], [&loser, &winner], &mut dice, &SilentSink);
        assert!(matches!(
            report.outcome,
            BattleOutcome::Victory {
                victor: BattleSide::Second,
                damage: 5,
                critical: false,
                loser_strength: 7,
                defeated: false,
            }
        ));
        assert!(!loser.is_defeated());

        // Exactly at each threshold the roll misses.
        let loser = ArmyState::with_strength(12);
        let mut dice = ScriptedDice::new([1000, 1000, 0, FIRST_WINS_CRITICAL_BP]);
        let report = fight([20, 10], [&winner, &loser], &mut dice, &SilentSink);
        assert_eq!(report.defeated(), None);

        let loser = ArmyState::with_strength(12);
        let mut dice = ScriptedDice::new([1000, 1000, 0, SECOND_WINS_CRITICAL_BP - 1]);
        let report = fight([10, 20], [&loser, &winner], &mut dice, &SilentSink);
        assert_eq!(report.defeated(), Some(BattleSide::First));
    }

    #[test]
    fn critical_needs_a_weak_army() {
        let winner = ArmyState::with_strength(50);
        let loser = ArmyState::with_strength(20);
        let mut dice = ScriptedDice::new([1000, 1000, 0, 0]);
        let report = fight([20, 10], [&winner, &loser], &mut dice, &SilentSink);
        // 20 - 5 = 15 is not below the threshold.
        assert!(matches!(
            report.outcome,
            BattleOutcome::Victory {
                critical: true,
                loser_strength: 15,
                defeated: false,
                ..
            }
        ));
    }

    #[test]
    fn exhausted_army_falls_to_any_loss() {
        let winner = ArmyState::with_strength(5);
        let loser = ArmyState::new();
        // 11 vs 10: base 0, damage 0, but the loser already has nothing.
        let mut dice = ScriptedDice::new([1000, 1000, 0, 9999]);
        let report = fight([11, 10], [&winner, &loser], &mut dice, &SilentSink);
        assert_eq!(report.defeated(), Some(BattleSide::Second));
        assert!(loser.is_defeated());
    }

    #[test]
    fn tie_break_damages_without_defeat() {
        let first = ArmyState::with_strength(3);
        let second = ArmyState::with_strength(30);
        let sink = RecordingSink::new();
        // Break (2999 < 3000), coin 1 -> second advantaged, damage 4.
        let mut dice = ScriptedDice::new([1000, 1000, 2999, 1, 4]);
        let report = fight([50, 50], [&first, &second], &mut dice, &sink);

        assert_eq!(
            report.outcome,
            BattleOutcome::TieBroken {
                advantaged: BattleSide::Second,
                damage: 4,
                loser_strength: 0,
            }
        );
        assert_eq!(first.strength(), 0);
        assert!(!first.is_defeated());
        assert_eq!(second.strength(), 30);
        assert_eq!(
            sink.count(|e| matches!(e, Narration::DrawAdvantage { kingdom, .. } if kingdom == "Kingdom 2")),
            1
        );
    }

    #[test]
    fn tie_without_break_is_stalemate() {
        let first = ArmyState::with_strength(8);
        let second = ArmyState::with_strength(9);
        let sink = RecordingSink::new();
        let mut dice = ScriptedDice::new([1000, 1000, TIE_BREAK_BP]);
        let report = fight([0, 0], [&first, &second], &mut dice, &sink);

        assert_eq!(report.outcome, BattleOutcome::Stalemate);
        assert_eq!(first.strength(), 8);
        assert_eq!(second.strength(), 9);
        assert_eq!(sink.events(), vec![Narration::Stalemate]);
    }

    #[test]
    fn notable_factors_are_narrated() {
        let first = ArmyState::with_strength(100);
        let second = ArmyState::with_strength(100);
        let sink = RecordingSink::new();
        let mut dice = ScriptedDice::new([1150, 850, 0, 9999]);
        let report = fight([100, 100], [&first, &second], &mut dice, &sink);

        assert_eq!(report.adjusted, [115, 85]);
        let conditions: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Narration::BattleConditions {
                    kingdom,
                    conditions,
                    factor_permille,
                } => Some((kingdom, conditions, factor_permille)),
                _ => None,
            })
            .collect();
        assert_eq!(
            conditions,
            vec![
                (String::from("Kingdom 1"), Conditions::Favorable, 1150),
                (String::from("Kingdom 2"), Conditions::Unfavorable, 850),
            ]
        );
    }

    proptest! {
        #[test]
        fn battle_invariants(
            combat in prop::array::uniform2(0_u32..5_000),
            strengths in prop::array::uniform2(0_u32..500),
            seed in any::<u64>(),
        ) {
            let [first_strength, second_strength] = strengths;
            let first = ArmyState::with_strength(first_strength);
            let second = ArmyState::with_strength(second_strength);
            let mut dice = SeededDice::from_seed(seed);
            let report = fight(combat, [&first, &second], &mut dice, &SilentSink);

            let [first_adjusted, second_adjusted] = report.adjusted;
            let [first_factor, second_factor] = report.factors;
            prop_assert!((800..=1200).contains(&first_factor.permille()));
            prop_assert!((800..=1200).contains(&second_factor.permille()));

            // Never both defeated, and defeat only follows a clear win.
            prop_assert!(!(first.is_defeated() && second.is_defeated()));

            match report.outcome {
                BattleOutcome::Victory { victor, damage, loser_strength, defeated, .. } => {
                    let (winning, losing, loser_before, loser, winner_army, winner_before) =
                        match victor {
                            BattleSide::First => (first_adjusted, second_adjusted, second_strength, &second, &first, first_strength),
                            BattleSide::Second => (second_adjusted, first_adjusted, first_strength, &first, &second, second_strength),
                        };
                    prop_assert!(winning > losing);
                    let base = (winning - losing) / 2;
                    prop_assert!((base..=base + base / 2).contains(&damage));
                    prop_assert_eq!(loser_strength, loser_before.saturating_sub(damage));
                    prop_assert_eq!(loser.strength(), loser_strength);
                    prop_assert_eq!(loser.is_defeated(), defeated);
                    prop_assert_eq!(winner_army.strength(), winner_before);
                    prop_assert!(!winner_army.is_defeated());
                    if damage > DEFEAT_DAMAGE_THRESHOLD || loser_strength == 0 {
                        prop_assert!(defeated);
                    }
                }
                BattleOutcome::TieBroken { damage, .. } => {
                    prop_assert_eq!(first_adjusted, second_adjusted);
                    prop_assert!((1..=5).contains(&damage));
                    prop_assert!(!first.is_defeated() && !second.is_defeated());
                }
                BattleOutcome::Stalemate => {
                    prop_assert_eq!(first_adjusted, second_adjusted);
                    prop_assert_eq!(first.strength(), first_strength);
                    prop_assert_eq!(second.strength(), second_strength);
                }
            }
        }
    }
}
