//! Result History Index
//!
//! Provides O(1) lookup of a driver's or constructor's past results, used by the
//! trailing-window performance projections.

use std::collections::HashMap;

use crate::data::{RawTables, PODIUM_POSITIONS};

/// Single past result with its season attached
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalResult {
    pub season: i32,
    pub race_id: i64,
    pub driver_id: i64,
    pub constructor_id: i64,
    pub position_order: Option<i64>,
    pub points: f64,
}

impl HistoricalResult {
    pub fn is_podium(&self) -> bool {
        self.position_order.is_some_and(|p| p <= PODIUM_POSITIONS)
    }
}

/// Results indexed by driver and by constructor, sorted by season descending
#[derive(Debug, Default)]
pub struct ResultHistoryIndex {
    by_driver: HashMap<i64, Vec<HistoricalResult>>,
    by_constructor: HashMap<i64, Vec<HistoricalResult>>,
}

impl ResultHistoryIndex {
    /// Index every result whose race is on the calendar.
    /// Unclassified results are kept; missing points count as zero.
    pub fn build(tables: &RawTables) -> Self {
        let mut by_driver: HashMap<i64, Vec<HistoricalResult>> = HashMap::new();
        let mut by_constructor: HashMap<i64, Vec<HistoricalResult>> = HashMap::new();

        for result in &tables.results {
            let Some(season) = tables.race_year(result.race_id) else {
                continue;
            };

            let entry = HistoricalResult {
                season,
                race_id: result.race_id,
                driver_id: result.driver_id,
                constructor_id: result.constructor_id,
                position_order: result.position_order,
                points: result.points.unwrap_or(0.0),
            };

            by_constructor
                .entry(result.constructor_id)
                .or_default()
                .push(entry.clone());
            by_driver.entry(result.driver_id).or_default().push(entry);
        }

        // Most recent season first
        for results in by_driver.values_mut().chain(by_constructor.values_mut()) {
            results.sort_by(|a, b| b.season.cmp(&a.season));
        }

        Self {
            by_driver,
            by_constructor,
        }
    }

    /// Driver results with `before - seasons <= season < before`
    pub fn driver_window(&self, driver_id: i64, before: i32, seasons: i32) -> Vec<&HistoricalResult> {
        Self::window(self.by_driver.get(&driver_id), before, seasons)
    }

    /// Constructor results with `before - seasons <= season < before`
    pub fn constructor_window(
        &self,
        constructor_id: i64,
        before: i32,
        seasons: i32,
    ) -> Vec<&HistoricalResult> {
        Self::window(self.by_constructor.get(&constructor_id), before, seasons)
    }

    fn window(
        results: Option<&Vec<HistoricalResult>>,
        before: i32,
        seasons: i32,
    ) -> Vec<&HistoricalResult> {
        results
            .map(|results| {
                results
                    .iter()
                    .filter(|r| r.season < before && r.season >= before - seasons)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the driver has any result in `[from, to]`
    pub fn driver_active_between(&self, driver_id: i64, from: i32, to: i32) -> bool {
        Self::active(self.by_driver.get(&driver_id), from, to)
    }

    /// Whether the constructor has any result in `[from, to]`
    pub fn constructor_active_between(&self, constructor_id: i64, from: i32, to: i32) -> bool {
        Self::active(self.by_constructor.get(&constructor_id), from, to)
    }

    fn active(results: Option<&Vec<HistoricalResult>>, from: i32, to: i32) -> bool {
        results.is_some_and(|results| results.iter().any(|r| (from..=to).contains(&r.season)))
    }

    /// Number of indexed drivers
    pub fn driver_count(&self) -> usize {
        self.by_driver.len()
    }
}
