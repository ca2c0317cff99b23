//! Feature Engineering
//!
//! Builds training and inference rows from the raw tables. Two strategies live
//! side by side and are never mixed:
//!
//! - season aggregates per (season, driver) and (season, constructor), labelled
//!   with the championship outcome
//! - raw per-row samples (one race result, or one driver's season points) that
//!   skip temporal aggregation entirely

use crate::data::{RaceResult, RawTables, StandingSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Finishing positions counted as a podium
pub const PODIUM_POSITIONS: i64 = 3;

/// A labelled row that can be projected onto named feature columns
pub trait FeatureRow {
    /// Value of a named feature column, None if this row has no such column
    fn feature(&self, column: &str) -> Option<f64>;

    /// Binary target (0 or 1)
    fn label(&self) -> u8;

    /// Driver or constructor id this row describes
    fn entity_id(&self) -> i64;
}

/// Race result joined with its season and circuit country
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedResult {
    pub season: i32,
    pub race_id: i64,
    pub driver_id: i64,
    pub constructor_id: i64,
    pub grid: i64,
    pub position_order: i64,
    pub points: f64,
    pub laps: Option<f64>,
    pub country: Option<String>,
}

/// Season aggregate features for one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDriverFeatures {
    pub season: i32,
    pub driver_id: i64,
    pub total_points: f64,
    pub avg_points: f64,
    pub max_points: f64,
    pub avg_position: f64,
    pub best_position: f64,
    pub avg_grid: f64,
    pub total_laps: f64,
    pub avg_laps: f64,
    pub seasons_experience: f64,
    pub age: f64,
    pub is_champion: u8,
}

/// Season aggregate features for one constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonConstructorFeatures {
    pub season: i32,
    pub constructor_id: i64,
    pub total_points: f64,
    pub avg_points: f64,
    pub max_points: f64,
    pub avg_position: f64,
    pub best_position: f64,
    pub avg_grid: f64,
    pub total_laps: f64,
    pub avg_laps: f64,
    pub seasons_experience: f64,
    pub num_drivers: f64,
    pub is_champion: u8,
}

/// Raw per-race row for the podium task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodiumSample {
    pub driver_id: i64,
    pub constructor_id: i64,
    pub grid: i64,
    pub is_podium: u8,
}

/// Raw per-season row for the season-points championship task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonPointsSample {
    pub season: i32,
    pub driver_id: i64,
    pub points: f64,
    pub is_champion: u8,
}

impl FeatureRow for SeasonDriverFeatures {
    fn feature(&self, column: &str) -> Option<f64> {
        let value = match column {
            "year" => self.season as f64,
            "driverId" => self.driver_id as f64,
            "total_points" => self.total_points,
            "avg_points" => self.avg_points,
            "max_points" => self.max_points,
            "avg_position" => self.avg_position,
            "best_position" => self.best_position,
            "avg_grid" => self.avg_grid,
            "total_laps" => self.total_laps,
            "avg_laps" => self.avg_laps,
            "seasons_experience" => self.seasons_experience,
            "age" => self.age,
            _ => return None,
        };
        Some(value)
    }

    fn label(&self) -> u8 {
        self.is_champion
    }

    fn entity_id(&self) -> i64 {
        self.driver_id
    }
}

impl FeatureRow for SeasonConstructorFeatures {
    fn feature(&self, column: &str) -> Option<f64> {
        let value = match column {
            "year" => self.season as f64,
            "constructorId" => self.constructor_id as f64,
            "total_points" => self.total_points,
            "avg_points" => self.avg_points,
            "max_points" => self.max_points,
            "avg_position" => self.avg_position,
            "best_position" => self.best_position,
            "avg_grid" => self.avg_grid,
            "total_laps" => self.total_laps,
            "avg_laps" => self.avg_laps,
            "seasons_experience" => self.seasons_experience,
            "num_drivers" => self.num_drivers,
            _ => return None,
        };
        Some(value)
    }

    fn label(&self) -> u8 {
        self.is_champion
    }

    fn entity_id(&self) -> i64 {
        self.constructor_id
    }
}

impl FeatureRow for PodiumSample {
    fn feature(&self, column: &str) -> Option<f64> {
        match column {
            "driverId" => Some(self.driver_id as f64),
            "constructorId" => Some(self.constructor_id as f64),
            "grid" => Some(self.grid as f64),
            _ => None,
        }
    }

    fn label(&self) -> u8 {
        self.is_podium
    }

    fn entity_id(&self) -> i64 {
        self.driver_id
    }
}

impl FeatureRow for SeasonPointsSample {
    fn feature(&self, column: &str) -> Option<f64> {
        match column {
            "year" => Some(self.season as f64),
            "driverId" => Some(self.driver_id as f64),
            "points" => Some(self.points),
            _ => None,
        }
    }

    fn label(&self) -> u8 {
        self.is_champion
    }

    fn entity_id(&self) -> i64 {
        self.driver_id
    }
}

/// Feature tables derived once from the raw tables
#[derive(Debug, Clone, Default)]
pub struct FeatureTables {
    pub drivers: Vec<SeasonDriverFeatures>,
    pub constructors: Vec<SeasonConstructorFeatures>,
}

impl FeatureTables {
    pub fn build(tables: &RawTables) -> Self {
        let results = FeatureEngineering::enrich_results(tables);
        Self {
            drivers: FeatureEngineering::driver_features_from(tables, &results),
            constructors: FeatureEngineering::constructor_features_from(tables, &results),
        }
    }

    /// Latest season with any feature row
    pub fn latest_season(&self) -> Option<i32> {
        self.drivers
            .iter()
            .map(|r| r.season)
            .chain(self.constructors.iter().map(|r| r.season))
            .max()
    }

    pub fn drivers_in_season(&self, season: i32) -> Vec<SeasonDriverFeatures> {
        self.drivers
            .iter()
            .filter(|r| r.season == season)
            .cloned()
            .collect()
    }

    pub fn constructors_in_season(&self, season: i32) -> Vec<SeasonConstructorFeatures> {
        self.constructors
            .iter()
            .filter(|r| r.season == season)
            .cloned()
            .collect()
    }
}

/// Running aggregate for one (season, entity) group
#[derive(Debug, Default)]
struct SeasonAccumulator {
    count: usize,
    points_sum: f64,
    points_max: f64,
    position_sum: f64,
    position_min: Option<i64>,
    grid_sum: f64,
    laps_sum: f64,
    laps_count: usize,
    drivers: BTreeSet<i64>,
}

impl SeasonAccumulator {
    fn push(&mut self, result: &EnrichedResult) {
        if self.count == 0 || result.points > self.points_max {
            self.points_max = result.points;
        }
        self.count += 1;
        self.points_sum += result.points;
        self.position_sum += result.position_order as f64;
        self.position_min = Some(
            self.position_min
                .map_or(result.position_order, |m| m.min(result.position_order)),
        );
        self.grid_sum += result.grid as f64;
        if let Some(laps) = result.laps {
            self.laps_sum += laps;
            self.laps_count += 1;
        }
        self.drivers.insert(result.driver_id);
    }

    fn avg_points(&self) -> f64 {
        self.points_sum / self.count as f64
    }

    fn avg_position(&self) -> f64 {
        self.position_sum / self.count as f64
    }

    fn avg_grid(&self) -> f64 {
        self.grid_sum / self.count as f64
    }

    fn avg_laps(&self) -> f64 {
        if self.laps_count == 0 {
            0.0
        } else {
            self.laps_sum / self.laps_count as f64
        }
    }
}

/// Feature engineering over the raw tables
pub struct FeatureEngineering;

impl FeatureEngineering {
    /// Valid finishes joined with season and circuit country.
    ///
    /// Drops results with `positionOrder <= 0` or missing points/grid/positionOrder,
    /// and results whose race is not on the calendar (no season to group by).
    pub fn enrich_results(tables: &RawTables) -> Vec<EnrichedResult> {
        let enriched: Vec<EnrichedResult> = tables
            .results
            .iter()
            .filter_map(|r| Self::enrich(tables, r))
            .collect();

        debug!(
            "Enriched {} of {} results",
            enriched.len(),
            tables.results.len()
        );
        enriched
    }

    fn enrich(tables: &RawTables, result: &RaceResult) -> Option<EnrichedResult> {
        let position_order = result.position_order.filter(|&p| p > 0)?;
        let points = result.points?;
        let grid = result.grid?;
        let race = tables.race(result.race_id)?;
        let country = race
            .circuit_id
            .and_then(|id| tables.circuit(id))
            .and_then(|c| c.country.clone());

        Some(EnrichedResult {
            season: race.year,
            race_id: result.race_id,
            driver_id: result.driver_id,
            constructor_id: result.constructor_id,
            grid,
            position_order,
            points,
            laps: result.laps,
            country,
        })
    }

    /// Distinct seasons with at least one valid result, per entity
    fn seasons_experience<F>(results: &[EnrichedResult], key: F) -> HashMap<i64, usize>
    where
        F: Fn(&EnrichedResult) -> i64,
    {
        let mut seasons: HashMap<i64, BTreeSet<i32>> = HashMap::new();
        for result in results {
            seasons.entry(key(result)).or_default().insert(result.season);
        }
        seasons.into_iter().map(|(id, s)| (id, s.len())).collect()
    }

    fn group_by_season<F>(
        results: &[EnrichedResult],
        key: F,
    ) -> BTreeMap<(i32, i64), SeasonAccumulator>
    where
        F: Fn(&EnrichedResult) -> i64,
    {
        let mut groups: BTreeMap<(i32, i64), SeasonAccumulator> = BTreeMap::new();
        for result in results {
            groups
                .entry((result.season, key(result)))
                .or_default()
                .push(result);
        }
        groups
    }

    pub fn driver_features(tables: &RawTables) -> Vec<SeasonDriverFeatures> {
        let results = Self::enrich_results(tables);
        Self::driver_features_from(tables, &results)
    }

    pub fn constructor_features(tables: &RawTables) -> Vec<SeasonConstructorFeatures> {
        let results = Self::enrich_results(tables);
        Self::constructor_features_from(tables, &results)
    }

    fn driver_features_from(
        tables: &RawTables,
        results: &[EnrichedResult],
    ) -> Vec<SeasonDriverFeatures> {
        let experience = Self::seasons_experience(results, |r| r.driver_id);
        let champions = season_champions(tables, &tables.driver_standings);

        Self::group_by_season(results, |r| r.driver_id)
            .into_iter()
            .map(|((season, driver_id), acc)| {
                let age = tables
                    .driver(driver_id)
                    .and_then(|d| d.birth_year())
                    .map_or(0.0, |born| (season - born) as f64);

                SeasonDriverFeatures {
                    season,
                    driver_id,
                    total_points: acc.points_sum,
                    avg_points: acc.avg_points(),
                    max_points: acc.points_max,
                    avg_position: acc.avg_position(),
                    best_position: acc.position_min.unwrap_or(0) as f64,
                    avg_grid: acc.avg_grid(),
                    total_laps: acc.laps_sum,
                    avg_laps: acc.avg_laps(),
                    seasons_experience: experience.get(&driver_id).copied().unwrap_or(0) as f64,
                    age,
                    is_champion: is_champion(&champions, season, driver_id),
                }
            })
            .collect()
    }

    fn constructor_features_from(
        tables: &RawTables,
        results: &[EnrichedResult],
    ) -> Vec<SeasonConstructorFeatures> {
        let experience = Self::seasons_experience(results, |r| r.constructor_id);
        let champions = season_champions(tables, &tables.constructor_standings);

        Self::group_by_season(results, |r| r.constructor_id)
            .into_iter()
            .map(|((season, constructor_id), acc)| SeasonConstructorFeatures {
                season,
                constructor_id,
                total_points: acc.points_sum,
                avg_points: acc.avg_points(),
                max_points: acc.points_max,
                avg_position: acc.avg_position(),
                best_position: acc.position_min.unwrap_or(0) as f64,
                avg_grid: acc.avg_grid(),
                total_laps: acc.laps_sum,
                avg_laps: acc.avg_laps(),
                seasons_experience: experience.get(&constructor_id).copied().unwrap_or(0) as f64,
                num_drivers: acc.drivers.len() as f64,
                is_champion: is_champion(&champions, season, constructor_id),
            })
            .collect()
    }

    /// One row per classified result, labelled podium / no podium.
    /// No season aggregation and no join with the calendar.
    pub fn podium_samples(tables: &RawTables) -> Vec<PodiumSample> {
        tables
            .results
            .iter()
            .filter_map(|r| {
                let position_order = r.position_order.filter(|&p| p > 0)?;
                let grid = r.grid?;
                Some(PodiumSample {
                    driver_id: r.driver_id,
                    constructor_id: r.constructor_id,
                    grid,
                    is_podium: u8::from(position_order <= PODIUM_POSITIONS),
                })
            })
            .collect()
    }

    /// Season-end points per driver, labelled with the drivers' champion(s)
    pub fn season_points_samples(tables: &RawTables) -> Vec<SeasonPointsSample> {
        let champions = season_champions(tables, &tables.driver_standings);

        season_points(tables, &tables.driver_standings)
            .into_iter()
            .map(|((season, driver_id), points)| SeasonPointsSample {
                season,
                driver_id,
                points,
                is_champion: is_champion(&champions, season, driver_id),
            })
            .collect()
    }
}

/// Max cumulative standings points per (season, entity)
fn season_points(
    tables: &RawTables,
    standings: &[StandingSnapshot],
) -> BTreeMap<(i32, i64), f64> {
    let mut points: BTreeMap<(i32, i64), f64> = BTreeMap::new();
    for row in standings {
        let Some(season) = tables.race_year(row.race_id) else {
            continue;
        };
        points
            .entry((season, row.entity_id))
            .and_modify(|p| *p = p.max(row.points))
            .or_insert(row.points);
    }
    points
}

/// Champion ids per season: every entity whose standings points equal the
/// season maximum. Tied leaders are all champions.
pub fn season_champions(
    tables: &RawTables,
    standings: &[StandingSnapshot],
) -> BTreeMap<i32, BTreeSet<i64>> {
    let points = season_points(tables, standings);

    let mut season_max: BTreeMap<i32, f64> = BTreeMap::new();
    for (&(season, _), &p) in &points {
        season_max
            .entry(season)
            .and_modify(|m| *m = m.max(p))
            .or_insert(p);
    }

    let mut champions: BTreeMap<i32, BTreeSet<i64>> = BTreeMap::new();
    for (&(season, entity_id), &p) in &points {
        if season_max.get(&season) == Some(&p) {
            champions.entry(season).or_default().insert(entity_id);
        }
    }
    champions
}

fn is_champion(champions: &BTreeMap<i32, BTreeSet<i64>>, season: i32, id: i64) -> u8 {
    u8::from(champions.get(&season).is_some_and(|ids| ids.contains(&id)))
}
