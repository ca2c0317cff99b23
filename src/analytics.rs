//! Analytics Aggregator
//!
//! Grouped views over the raw tables (per-season driver points, team points,
//! podium counts), the active entity lists and the trailing-window performance
//! projections. None of these use a trained model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::data::{RawTables, ResultHistoryIndex, PODIUM_POSITIONS};
use crate::predictor::Confidence;

/// Seasons looked back over by the projections
pub const PROJECTION_WINDOW: i32 = 3;
/// Regression-to-the-mean factor applied to projected points
pub const POINTS_REGRESSION: f64 = 0.9;

const PODIUM_RATE_BOOST: f64 = 1.2;
const MAX_PODIUM_PROBABILITY: f64 = 0.8;
const CHAMPIONSHIP_SHARE: f64 = 0.3;
const CONTENDER_POINTS: f64 = 200.0;
const FAVOURITE_TEAM_POINTS: f64 = 400.0;
const MIN_RACES_FOR_MEDIUM: usize = 10;
const INSUFFICIENT_DATA: &str = "Insufficient historical data";

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("Driver not found")]
    DriverNotFound(i64),

    #[error("Constructor not found")]
    ConstructorNotFound(i64),
}

/// Mean points per race of one driver in one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverPerformance {
    pub year: i32,
    #[serde(rename = "driverId")]
    pub driver_id: i64,
    pub forename: String,
    pub surname: String,
    pub points: f64,
    pub driver_name: String,
}

/// Points scored by one constructor in one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub year: i32,
    #[serde(rename = "constructorId")]
    pub constructor_id: i64,
    pub name: String,
    pub points: f64,
}

/// Podium finishes of one driver in one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodiumCount {
    pub year: i32,
    #[serde(rename = "driverId")]
    pub driver_id: i64,
    pub forename: String,
    pub surname: String,
    pub podiums: usize,
    pub driver_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDriver {
    #[serde(rename = "driverId")]
    pub driver_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveConstructor {
    #[serde(rename = "constructorId")]
    pub constructor_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverOutlook {
    pub points: f64,
    pub podium_probability: f64,
    pub championship_probability: f64,
}

/// Heuristic season outlook for a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProjection {
    pub driver_name: String,
    pub predictions: DriverOutlook,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub based_on_races: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorOutlook {
    pub points: f64,
    pub championship_probability: f64,
}

/// Heuristic season outlook for a constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorProjection {
    pub constructor_name: String,
    pub predictions: ConstructorOutlook,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub based_on_seasons: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Aggregated views over the raw tables
pub struct Analytics<'a> {
    tables: &'a RawTables,
    history: &'a ResultHistoryIndex,
}

impl<'a> Analytics<'a> {
    pub fn new(tables: &'a RawTables, history: &'a ResultHistoryIndex) -> Self {
        Self { tables, history }
    }

    /// Mean points per (season, driver), optionally for one driver.
    /// Results whose race or driver is unknown are skipped.
    pub fn driver_performance(&self, driver_id: Option<i64>) -> Vec<DriverPerformance> {
        let mut groups: BTreeMap<(i32, i64), (f64, usize)> = BTreeMap::new();

        for result in &self.tables.results {
            if driver_id.is_some_and(|id| id != result.driver_id) {
                continue;
            }
            let Some(year) = self.tables.race_year(result.race_id) else {
                continue;
            };
            if self.tables.driver(result.driver_id).is_none() {
                continue;
            }

            let entry = groups.entry((year, result.driver_id)).or_default();
            if let Some(points) = result.points {
                entry.0 += points;
                entry.1 += 1;
            }
        }

        groups
            .into_iter()
            .filter_map(|((year, id), (sum, count))| {
                let driver = self.tables.driver(id)?;
                Some(DriverPerformance {
                    year,
                    driver_id: id,
                    forename: driver.forename.clone(),
                    surname: driver.surname.clone(),
                    points: if count > 0 { sum / count as f64 } else { 0.0 },
                    driver_name: driver.full_name(),
                })
            })
            .collect()
    }

    /// Summed points per (season, constructor), optionally for one constructor
    pub fn team_standings(&self, constructor_id: Option<i64>) -> Vec<TeamStanding> {
        let mut groups: BTreeMap<(i32, i64), f64> = BTreeMap::new();

        for result in &self.tables.results {
            if constructor_id.is_some_and(|id| id != result.constructor_id) {
                continue;
            }
            let Some(year) = self.tables.race_year(result.race_id) else {
                continue;
            };
            if self.tables.constructor(result.constructor_id).is_none() {
                continue;
            }
            *groups.entry((year, result.constructor_id)).or_default() +=
                result.points.unwrap_or(0.0);
        }

        groups
            .into_iter()
            .filter_map(|((year, id), points)| {
                let constructor = self.tables.constructor(id)?;
                Some(TeamStanding {
                    year,
                    constructor_id: id,
                    name: constructor.name.clone(),
                    points,
                })
            })
            .collect()
    }

    /// Podium finishes per (season, driver); pairs without a podium are omitted
    pub fn podium_frequency(&self, driver_id: Option<i64>) -> Vec<PodiumCount> {
        let mut groups: BTreeMap<(i32, i64), usize> = BTreeMap::new();

        for result in &self.tables.results {
            if driver_id.is_some_and(|id| id != result.driver_id) {
                continue;
            }
            if !result.position_order.is_some_and(|p| p <= PODIUM_POSITIONS) {
                continue;
            }
            let Some(year) = self.tables.race_year(result.race_id) else {
                continue;
            };
            *groups.entry((year, result.driver_id)).or_default() += 1;
        }

        groups
            .into_iter()
            .filter_map(|((year, id), podiums)| {
                let driver = self.tables.driver(id)?;
                Some(PodiumCount {
                    year,
                    driver_id: id,
                    forename: driver.forename.clone(),
                    surname: driver.surname.clone(),
                    podiums,
                    driver_name: driver.full_name(),
                })
            })
            .collect()
    }

    /// Drivers with a result in the `window_years` seasons ending at `reference_year`
    pub fn active_drivers(&self, reference_year: i32, window_years: i32) -> Vec<ActiveDriver> {
        let from = reference_year - window_years + 1;
        self.tables
            .drivers
            .iter()
            .filter(|d| self.history.driver_active_between(d.driver_id, from, reference_year))
            .map(|d| ActiveDriver {
                driver_id: d.driver_id,
                name: d.full_name(),
            })
            .collect()
    }

    pub fn active_constructors(&self, reference_year: i32, window_years: i32) -> Vec<ActiveConstructor> {
        let from = reference_year - window_years + 1;
        self.tables
            .constructors
            .iter()
            .filter(|c| {
                self.history
                    .constructor_active_between(c.constructor_id, from, reference_year)
            })
            .map(|c| ActiveConstructor {
                constructor_id: c.constructor_id,
                name: c.name.clone(),
            })
            .collect()
    }

    /// Distinct race years, most recent first
    pub fn seasons(&self) -> Vec<i32> {
        let mut seasons = self.tables.seasons();
        seasons.reverse();
        seasons
    }

    /// Project a driver's `year` from the preceding seasons' results
    pub fn project_driver(&self, driver_id: i64, year: i32) -> Result<DriverProjection, LookupError> {
        let driver = self
            .tables
            .driver(driver_id)
            .ok_or(LookupError::DriverNotFound(driver_id))?;
        let window = self.history.driver_window(driver_id, year, PROJECTION_WINDOW);

        let points: Vec<f64> = window.iter().map(|r| r.points).collect();
        let podiums = window.iter().filter(|r| r.is_podium()).count();

        Ok(driver_projection(driver.full_name(), &points, podiums))
    }

    /// Project a constructor's `year` from the preceding seasons' results
    pub fn project_constructor(
        &self,
        constructor_id: i64,
        year: i32,
    ) -> Result<ConstructorProjection, LookupError> {
        let constructor = self
            .tables
            .constructor(constructor_id)
            .ok_or(LookupError::ConstructorNotFound(constructor_id))?;
        let window = self
            .history
            .constructor_window(constructor_id, year, PROJECTION_WINDOW);

        let mut season_points: BTreeMap<i32, f64> = BTreeMap::new();
        for result in &window {
            *season_points.entry(result.season).or_default() += result.points;
        }
        let totals: Vec<f64> = season_points.into_values().collect();

        Ok(constructor_projection(constructor.name.clone(), &totals))
    }
}

/// Driver outlook from per-race points and the podium count of the window
pub fn driver_projection(driver_name: String, points: &[f64], podiums: usize) -> DriverProjection {
    if points.is_empty() {
        return DriverProjection {
            driver_name,
            predictions: DriverOutlook {
                points: 0.0,
                podium_probability: 0.0,
                championship_probability: 0.0,
            },
            confidence: Confidence::Low,
            based_on_races: None,
            note: Some(INSUFFICIENT_DATA.to_string()),
        };
    }

    let races = points.len();
    let avg_points = points.iter().sum::<f64>() / races as f64;
    let predicted_points = (avg_points * POINTS_REGRESSION).max(0.0);
    let podium_probability =
        (podiums as f64 / races.max(1) as f64 * PODIUM_RATE_BOOST).min(MAX_PODIUM_PROBABILITY);
    let championship_probability = if predicted_points > CONTENDER_POINTS {
        podium_probability * CHAMPIONSHIP_SHARE
    } else {
        0.0
    };

    DriverProjection {
        driver_name,
        predictions: DriverOutlook {
            points: round_to(predicted_points, 1),
            podium_probability: round_to(podium_probability, 3),
            championship_probability: round_to(championship_probability, 3),
        },
        confidence: if races >= MIN_RACES_FOR_MEDIUM {
            Confidence::Medium
        } else {
            Confidence::Low
        },
        based_on_races: Some(races),
        note: None,
    }
}

/// Constructor outlook from the summed points of each season in the window
pub fn constructor_projection(constructor_name: String, season_totals: &[f64]) -> ConstructorProjection {
    if season_totals.is_empty() {
        return ConstructorProjection {
            constructor_name,
            predictions: ConstructorOutlook {
                points: 0.0,
                championship_probability: 0.0,
            },
            confidence: Confidence::Low,
            based_on_seasons: None,
            note: Some(INSUFFICIENT_DATA.to_string()),
        };
    }

    let mean = season_totals.iter().sum::<f64>() / season_totals.len() as f64;
    let predicted_points = (mean * POINTS_REGRESSION).max(0.0);
    let championship_probability = if predicted_points > FAVOURITE_TEAM_POINTS {
        0.4
    } else if predicted_points > CONTENDER_POINTS {
        0.1
    } else {
        0.0
    };

    ConstructorProjection {
        constructor_name,
        predictions: ConstructorOutlook {
            points: round_to(predicted_points, 1),
            championship_probability: round_to(championship_probability, 3),
        },
        confidence: Confidence::Medium,
        based_on_seasons: Some(season_totals.len()),
        note: None,
    }
}
