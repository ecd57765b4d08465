//! Adaptive click simulator.
//!
//! Each trial ranks the items with the current weights, simulates clicks on
//! the top two offers, then nudges every weight one unit toward the target
//! click share:
//!
//! 1. Rank all items (weighted, without replacement).
//! 2. The first offer is clicked with probability `first_click`.
//! 3. Only if it was, the second offer is clicked with probability `second_click`.
//! 4. With no clicks recorded yet, weights are left alone.
//! 5. Otherwise an item under its target gains 1, an item over it loses 1
//!    (never below 1), and an item exactly on target is unchanged.
//!
//! The simulator owns the weights, the click counters and the random source
//! for the whole run. Nothing else holds them across trials.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{validate_items, ClickCounters, InputViolation, TargetRatios, WeightedItem};
use crate::ranking::rank_all;
use crate::report::SimulationReport;
use crate::rng::DrawSource;
use crate::sampler::SampleError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputViolation),
    #[error("sampling failed: {0}")]
    Sample(#[from] SampleError),
    #[error("iteration count must be positive")]
    ZeroIterations,
    #[error("{name} probability {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
}

/// Click behavior on a ranked offer list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickModel {
    /// Chance the top offer is clicked.
    pub first_click: f64,
    /// Chance the second offer is clicked, given the first was.
    pub second_click: f64,
}

impl Default for ClickModel {
    fn default() -> Self {
        Self {
            first_click: 0.3,
            second_click: 0.5,
        }
    }
}

impl ClickModel {
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, value) in [
            ("first_click", self.first_click),
            ("second_click", self.second_click),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimulationError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }
}

/// Where the simulator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorState {
    /// No trial has run yet.
    Idle,
    /// `trial` trials (1-based count) have completed and more remain.
    Running { trial: u64 },
    Done,
}

/// What the weight-adjustment step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// No clicks recorded yet, so no ratios to compare.
    Skipped,
    Applied { raised: usize, lowered: usize },
}

/// Result of one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// 1-based trial number.
    pub trial: u64,
    pub ranking: Vec<String>,
    /// Identifiers clicked this trial, in click order.
    pub clicked: Vec<String>,
    pub adjustment: Adjustment,
}

/// Move each weight one unit toward its target click share.
///
/// With zero total clicks nothing changes. Weights never drop below 1 through
/// this step. Items without a target are treated as targeting 0.
pub fn adjust_weights(
    items: &mut [WeightedItem],
    clicks: &ClickCounters,
    targets: &TargetRatios,
) -> Adjustment {
    let total = clicks.total();
    if total == 0 {
        return Adjustment::Skipped;
    }

    let mut raised = 0;
    let mut lowered = 0;
    for item in items.iter_mut() {
        let actual = clicks.get(&item.id) as f64 / total as f64;
        let target = targets.get(&item.id).unwrap_or(0.0);

        if actual < target {
            item.weight = item.weight.saturating_add(1);
            raised += 1;
        } else if actual > target && item.weight > 1 {
            item.weight -= 1;
            lowered += 1;
        }
    }
    Adjustment::Applied { raised, lowered }
}

/// One simulation run over a fixed number of trials.
#[derive(Debug)]
pub struct Simulator<D> {
    items: Vec<WeightedItem>,
    targets: TargetRatios,
    clicks: ClickCounters,
    model: ClickModel,
    iterations: u64,
    completed: u64,
    source: D,
}

impl<D: DrawSource> Simulator<D> {
    /// Validate the inputs and set up an idle simulator.
    ///
    /// Targets need not sum to 1, but every item needs one in `[0, 1]`.
    pub fn new(
        items: Vec<WeightedItem>,
        targets: TargetRatios,
        iterations: u64,
        model: ClickModel,
        source: D,
    ) -> Result<Self, SimulationError> {
        validate_items(&items)?;
        targets.validate_for(&items)?;
        model.validate()?;
        if iterations == 0 {
            return Err(SimulationError::ZeroIterations);
        }

        let target_sum = targets.sum();
        if (target_sum - 1.0).abs() > 1e-6 {
            warn!(target_sum, "target ratios do not sum to 1");
        }
        for id in targets.unknown_ids(&items) {
            warn!(id, "ignoring target for unknown item");
        }

        let clicks = ClickCounters::tracking(&items);
        Ok(Self {
            items,
            targets,
            clicks,
            model,
            iterations,
            completed: 0,
            source,
        })
    }

    pub fn state(&self) -> SimulatorState {
        if self.completed >= self.iterations {
            SimulatorState::Done
        } else if self.completed == 0 {
            SimulatorState::Idle
        } else {
            SimulatorState::Running {
                trial: self.completed,
            }
        }
    }

    pub fn items(&self) -> &[WeightedItem] {
        &self.items
    }

    pub fn clicks(&self) -> &ClickCounters {
        &self.clicks
    }

    pub fn targets(&self) -> &TargetRatios {
        &self.targets
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Run the next trial. Returns `None` once all trials are done.
    ///
    /// A sampling failure aborts the trial: no clicks or weight changes are
    /// recorded for it.
    pub fn step(&mut self) -> Result<Option<TrialOutcome>, SimulationError> {
        if self.completed >= self.iterations {
            return Ok(None);
        }

        let ranking = rank_all(&self.items, &mut self.source)?;

        let mut clicked = Vec::with_capacity(2);
        if let Some(first) = ranking.first() {
            if self.source.chance(self.model.first_click) {
                self.clicks.record(first);
                clicked.push(first.clone());

                if let Some(second) = ranking.get(1) {
                    if self.source.chance(self.model.second_click) {
                        self.clicks.record(second);
                        clicked.push(second.clone());
                    }
                }
            }
        }

        let adjustment = adjust_weights(&mut self.items, &self.clicks, &self.targets);
        self.completed += 1;

        debug!(
            trial = self.completed,
            ?ranking,
            ?clicked,
            ?adjustment,
            "trial complete"
        );

        Ok(Some(TrialOutcome {
            trial: self.completed,
            ranking,
            clicked,
            adjustment,
        }))
    }

    /// Run all remaining trials and report.
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        while self.step()?.is_some() {}
        let report = self.report();
        info!(
            trials = report.trials,
            total_clicks = report.total_clicks,
            distance = ?report.distance_to_targets(),
            "simulation finished"
        );
        Ok(report)
    }

    /// Snapshot of counts, weights and ratios so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport::from_state(self.completed, &self.items, &self.clicks, &self.targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedDraws;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn abcd() -> Vec<WeightedItem> {
        vec![
            WeightedItem::new("A", 4),
            WeightedItem::new("B", 2),
            WeightedItem::new("C", 2),
            WeightedItem::new("D", 1),
        ]
    }

    fn simulator<D: DrawSource>(iterations: u64, source: D) -> Simulator<D> {
        let items = abcd();
        let targets = TargetRatios::proportional_to(&items);
        Simulator::new(items, targets, iterations, ClickModel::default(), source).unwrap()
    }

    #[test]
    fn state_walks_idle_running_done() {
        let mut sim = simulator(2, StdRng::seed_from_u64(1));
        assert_eq!(sim.state(), SimulatorState::Idle);
        sim.step().unwrap();
        assert_eq!(sim.state(), SimulatorState::Running { trial: 1 });
        sim.step().unwrap();
        assert_eq!(sim.state(), SimulatorState::Done);
        assert_eq!(sim.step().unwrap(), None);
        assert_eq!(sim.completed(), 2);
    }

    #[test]
    fn no_click_trial_leaves_weights_unchanged() {
        // Coin script empty: chance() always false.
        let mut sim = simulator(3, ScriptedDraws::new(vec![0]));
        for _ in 0..3 {
            let outcome = sim.step().unwrap().unwrap();
            assert!(outcome.clicked.is_empty());
            assert_eq!(outcome.adjustment, Adjustment::Skipped);
        }
        assert_eq!(sim.items(), abcd().as_slice());
        assert_eq!(sim.clicks().total(), 0);
    }

    #[test]
    fn scripted_trial_clicks_top_two_and_adjusts() {
        // Ranking with all-zero draws is A, B, C, D; both coins land.
        let source = ScriptedDraws::new(vec![0]).with_coins(vec![true, true]);
        let mut sim = simulator(1, source);
        let outcome = sim.step().unwrap().unwrap();

        assert_eq!(outcome.ranking, vec!["A", "B", "C", "D"]);
        assert_eq!(outcome.clicked, vec!["A", "B"]);
        // A: 0.5 > 4/9 -> 3. B: 0.5 > 2/9 -> 1. C, D: 0 < target -> +1.
        let weights: Vec<u32> = sim.items().iter().map(|i| i.weight).collect();
        assert_eq!(weights, vec![3, 1, 3, 2]);
        assert_eq!(
            outcome.adjustment,
            Adjustment::Applied {
                raised: 2,
                lowered: 2
            }
        );
    }

    #[test]
    fn second_click_requires_first() {
        // First coin misses; the second coin is never consulted.
        let source = ScriptedDraws::new(vec![0]).with_coins(vec![false, true]);
        let mut sim = simulator(1, source);
        let outcome = sim.step().unwrap().unwrap();
        assert!(outcome.clicked.is_empty());
    }

    #[test]
    fn single_item_never_records_second_click() {
        let items = vec![WeightedItem::new("solo", 3)];
        let targets = TargetRatios::proportional_to(&items);
        let source = ScriptedDraws::new(vec![0]).with_coins(vec![true]);
        let mut sim = Simulator::new(items, targets, 5, ClickModel::default(), source).unwrap();
        let report = sim.run().unwrap();
        assert_eq!(report.total_clicks, 5);
        // Ratio equals target exactly, so the weight never moves.
        assert_eq!(report.items[0].weight, 3);
    }

    #[test]
    fn floor_holds_under_constant_overshoot() {
        let mut items = vec![WeightedItem::new("A", 2), WeightedItem::new("B", 2)];
        let mut clicks = ClickCounters::tracking(&items);
        clicks.record("A");
        let mut targets = TargetRatios::new();
        targets.insert("A", 0.0);
        targets.insert("B", 1.0);
        for _ in 0..10 {
            adjust_weights(&mut items, &clicks, &targets);
        }
        assert_eq!(items[0].weight, 1);
        assert_eq!(items[1].weight, 12);
    }

    #[test]
    fn on_target_weights_do_not_move() {
        let mut items = vec![WeightedItem::new("A", 5), WeightedItem::new("B", 5)];
        let mut clicks = ClickCounters::tracking(&items);
        clicks.record("A");
        clicks.record("B");
        let mut targets = TargetRatios::new();
        targets.insert("A", 0.5);
        targets.insert("B", 0.5);
        assert_eq!(
            adjust_weights(&mut items, &clicks, &targets),
            Adjustment::Applied {
                raised: 0,
                lowered: 0
            }
        );
        assert_eq!(items[0].weight, 5);
    }

    #[test]
    fn rejects_bad_setup() {
        let rng = || StdRng::seed_from_u64(0);
        let items = abcd();
        let targets = TargetRatios::proportional_to(&items);

        assert_eq!(
            Simulator::new(items.clone(), targets.clone(), 0, ClickModel::default(), rng())
                .unwrap_err(),
            SimulationError::ZeroIterations
        );
        assert!(matches!(
            Simulator::new(vec![], TargetRatios::new(), 10, ClickModel::default(), rng()),
            Err(SimulationError::InvalidInput(InputViolation::EmptySet))
        ));
        let model = ClickModel {
            first_click: 1.2,
            second_click: 0.5,
        };
        assert!(matches!(
            Simulator::new(items.clone(), targets.clone(), 10, model, rng()),
            Err(SimulationError::InvalidProbability {
                name: "first_click",
                ..
            })
        ));
        let mut zero = items.clone();
        zero[3].weight = 0;
        assert!(matches!(
            Simulator::new(zero, targets, 10, ClickModel::default(), rng()),
            Err(SimulationError::InvalidInput(InputViolation::ZeroWeight(_)))
        ));
    }

    #[test]
    fn targets_need_not_sum_to_one() {
        let items = abcd();
        let mut targets = TargetRatios::new();
        for item in &items {
            targets.insert(item.id.clone(), 0.5);
        }
        let mut sim =
            Simulator::new(items, targets, 50, ClickModel::default(), StdRng::seed_from_u64(3))
                .unwrap();
        let report = sim.run().unwrap();
        assert_eq!(report.trials, 50);
    }

    #[test]
    fn runs_with_own_counters_do_not_interfere() {
        let mut first = simulator(200, StdRng::seed_from_u64(5));
        let mut second = simulator(200, StdRng::seed_from_u64(5));
        let a = first.run().unwrap();
        let _ = simulator(300, StdRng::seed_from_u64(9)).run().unwrap();
        let b = second.run().unwrap();
        assert_eq!(a, b);
    }
}
