//! Final per-item report of a simulation run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{ClickCounters, TargetRatios, WeightedItem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: String,
    pub clicks: u64,
    pub weight: u32,
    pub target: f64,
    /// Click share; `None` when the run recorded no clicks at all.
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub trials: u64,
    pub total_clicks: u64,
    /// In the caller's item order.
    pub items: Vec<ItemReport>,
}

impl SimulationReport {
    pub fn from_state(
        trials: u64,
        items: &[WeightedItem],
        clicks: &ClickCounters,
        targets: &TargetRatios,
    ) -> Self {
        let items = items
            .iter()
            .map(|item| ItemReport {
                id: item.id.clone(),
                clicks: clicks.get(&item.id),
                weight: item.weight,
                target: targets.get(&item.id).unwrap_or(0.0),
                ratio: clicks.ratio(&item.id),
            })
            .collect();
        Self {
            trials,
            total_clicks: clicks.total(),
            items,
        }
    }

    pub fn item(&self, id: &str) -> Option<&ItemReport> {
        self.items.iter().find(|i| i.id == id)
    }

    /// L1 distance between observed click shares and targets.
    pub fn distance_to_targets(&self) -> Option<f64> {
        self.items
            .iter()
            .map(|i| i.ratio.map(|r| (r - i.target).abs()))
            .sum()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Final click counts:")?;
        for item in &self.items {
            write!(f, " {}={}", item.id, item.clicks)?;
        }
        writeln!(f)?;

        writeln!(f, "Final adjusted weights:")?;
        for item in &self.items {
            writeln!(f, "{}: {}", item.id, item.weight)?;
        }

        if self.total_clicks == 0 {
            return writeln!(f, "Final click ratios: n/a (no clicks recorded)");
        }
        writeln!(f, "Final click ratios:")?;
        for item in &self.items {
            let pct = item.ratio.unwrap_or(0.0) * 100.0;
            writeln!(f, "{}: {:.2}%", item.id, pct)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_items() -> (Vec<WeightedItem>, TargetRatios) {
        let items = vec![WeightedItem::new("A", 3), WeightedItem::new("B", 1)];
        let targets = TargetRatios::proportional_to(&items);
        (items, targets)
    }

    #[test]
    fn report_follows_item_order() {
        let (items, targets) = two_items();
        let mut clicks = ClickCounters::tracking(&items);
        clicks.record("B");
        clicks.record("A");
        clicks.record("A");
        clicks.record("A");
        let report = SimulationReport::from_state(10, &items, &clicks, &targets);

        assert_eq!(report.total_clicks, 4);
        assert_eq!(report.items[0].id, "A");
        assert_eq!(report.item("A").unwrap().ratio, Some(0.75));
        assert_eq!(report.distance_to_targets(), Some(0.0));
    }

    #[test]
    fn zero_clicks_have_no_ratios() {
        let (items, targets) = two_items();
        let clicks = ClickCounters::tracking(&items);
        let report = SimulationReport::from_state(5, &items, &clicks, &targets);

        assert!(report.items.iter().all(|i| i.ratio.is_none()));
        assert_eq!(report.distance_to_targets(), None);
        assert!(report.to_string().contains("n/a (no clicks recorded)"));
    }

    #[test]
    fn display_prints_percentages() {
        let (items, targets) = two_items();
        let mut clicks = ClickCounters::tracking(&items);
        clicks.record("A");
        clicks.record("A");
        clicks.record("B");
        let text = SimulationReport::from_state(3, &items, &clicks, &targets).to_string();

        assert!(text.starts_with("Final click counts: A=2 B=1\n"));
        assert!(text.contains("Final adjusted weights:\nA: 3\nB: 1\n"));
        assert!(text.contains("A: 66.67%\nB: 33.33%\n"));
    }

    #[test]
    fn report_serializes_to_json() {
        let (items, targets) = two_items();
        let clicks = ClickCounters::tracking(&items);
        let report = SimulationReport::from_state(1, &items, &clicks, &targets);
        let json = serde_json::to_string(&report).unwrap();
        let back: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
