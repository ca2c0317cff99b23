//! CSV data loading for race results, standings and reference tables

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Raw data file names inside the data directory
pub const RESULTS_FILE: &str = "results.csv";
pub const RACES_FILE: &str = "races.csv";
pub const CIRCUITS_FILE: &str = "circuits.csv";
pub const DRIVERS_FILE: &str = "drivers.csv";
pub const CONSTRUCTORS_FILE: &str = "constructors.csv";
pub const DRIVER_STANDINGS_FILE: &str = "driver_standings.csv";
pub const CONSTRUCTOR_STANDINGS_FILE: &str = "constructor_standings.csv";

/// Marker used by the source data set for missing values
const NULL_MARKER: &str = "\\N";

/// Data loading errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: PolarsError,
    },

    #[error("missing value for {column} in {file} row {row}")]
    MissingValue {
        file: String,
        column: String,
        row: usize,
    },
}

/// One driver's classified result in one race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResult {
    pub race_id: i64,
    pub driver_id: i64,
    pub constructor_id: i64,
    pub grid: Option<i64>,
    pub position_order: Option<i64>,
    pub points: Option<f64>,
    pub laps: Option<f64>,
}

/// Race calendar entry
#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    pub race_id: i64,
    pub year: i32,
    pub circuit_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    pub circuit_id: i64,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    pub driver_id: i64,
    pub forename: String,
    pub surname: String,
    pub dob: Option<NaiveDate>,
}

impl Driver {
    /// Display name: "{forename} {surname}"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.forename, self.surname)
    }

    pub fn birth_year(&self) -> Option<i32> {
        self.dob.map(|d| d.year())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub constructor_id: i64,
    pub name: String,
}

/// Cumulative championship points of a driver or constructor after a race
#[derive(Debug, Clone, PartialEq)]
pub struct StandingSnapshot {
    pub race_id: i64,
    pub entity_id: i64,
    pub points: f64,
}

/// All raw tables, loaded once and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub results: Vec<RaceResult>,
    pub races: Vec<Race>,
    pub circuits: Vec<Circuit>,
    pub drivers: Vec<Driver>,
    pub constructors: Vec<Constructor>,
    pub driver_standings: Vec<StandingSnapshot>,
    pub constructor_standings: Vec<StandingSnapshot>,
    race_index: HashMap<i64, usize>,
    driver_index: HashMap<i64, usize>,
    constructor_index: HashMap<i64, usize>,
    circuit_index: HashMap<i64, usize>,
}

impl RawTables {
    /// Build tables from already parsed records
    pub fn new(
        results: Vec<RaceResult>,
        races: Vec<Race>,
        circuits: Vec<Circuit>,
        drivers: Vec<Driver>,
        constructors: Vec<Constructor>,
        driver_standings: Vec<StandingSnapshot>,
        constructor_standings: Vec<StandingSnapshot>,
    ) -> Self {
        let race_index = races.iter().enumerate().map(|(i, r)| (r.race_id, i)).collect();
        let driver_index = drivers
            .iter()
            .enumerate()
            .map(|(i, d)| (d.driver_id, i))
            .collect();
        let constructor_index = constructors
            .iter()
            .enumerate()
            .map(|(i, c)| (c.constructor_id, i))
            .collect();
        let circuit_index = circuits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.circuit_id, i))
            .collect();

        Self {
            results,
            races,
            circuits,
            drivers,
            constructors,
            driver_standings,
            constructor_standings,
            race_index,
            driver_index,
            constructor_index,
            circuit_index,
        }
    }

    /// Load every table from a data directory
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, DataError> {
        let dir = data_dir.as_ref();
        info!("Loading raw tables from {:?}", dir);

        let tables = Self::new(
            load_results(&dir.join(RESULTS_FILE))?,
            load_races(&dir.join(RACES_FILE))?,
            load_circuits(&dir.join(CIRCUITS_FILE))?,
            load_drivers(&dir.join(DRIVERS_FILE))?,
            load_constructors(&dir.join(CONSTRUCTORS_FILE))?,
            load_standings(&dir.join(DRIVER_STANDINGS_FILE), "driverId")?,
            load_standings(&dir.join(CONSTRUCTOR_STANDINGS_FILE), "constructorId")?,
        );

        info!(
            "Loaded {} results, {} races, {} drivers, {} constructors",
            tables.results.len(),
            tables.races.len(),
            tables.drivers.len(),
            tables.constructors.len()
        );
        Ok(tables)
    }

    pub fn race(&self, race_id: i64) -> Option<&Race> {
        self.race_index.get(&race_id).map(|&i| &self.races[i])
    }

    /// Season of a race - O(1)
    pub fn race_year(&self, race_id: i64) -> Option<i32> {
        self.race(race_id).map(|r| r.year)
    }

    pub fn circuit(&self, circuit_id: i64) -> Option<&Circuit> {
        self.circuit_index.get(&circuit_id).map(|&i| &self.circuits[i])
    }

    pub fn driver(&self, driver_id: i64) -> Option<&Driver> {
        self.driver_index.get(&driver_id).map(|&i| &self.drivers[i])
    }

    pub fn constructor(&self, constructor_id: i64) -> Option<&Constructor> {
        self.constructor_index
            .get(&constructor_id)
            .map(|&i| &self.constructors[i])
    }

    /// Display name, or a placeholder for ids missing from the reference table
    pub fn driver_name(&self, driver_id: i64) -> String {
        self.driver(driver_id)
            .map(Driver::full_name)
            .unwrap_or_else(|| format!("Driver {}", driver_id))
    }

    pub fn constructor_name(&self, constructor_id: i64) -> String {
        self.constructor(constructor_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("Constructor {}", constructor_id))
    }

    /// Distinct seasons on the race calendar, ascending
    pub fn seasons(&self) -> Vec<i32> {
        self.races
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn latest_season(&self) -> Option<i32> {
        self.races.iter().map(|r| r.year).max()
    }
}

fn read_frame(path: &Path) -> Result<DataFrame, DataError> {
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    debug!("Reading {:?}", path);

    // Scan every row for the schema: some numeric columns only turn null late in the file
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|options| {
            options.with_null_values(Some(NullValues::AllColumnsSingle(NULL_MARKER.into())))
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|source| DataError::Csv {
            file: file_label(path),
            source,
        })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a column as optional integers; malformed values become None
fn int_column(df: &DataFrame, file: &str, name: &str) -> Result<Vec<Option<i64>>, DataError> {
    let wrap = |source| DataError::Csv {
        file: file.to_string(),
        source,
    };
    let series = df.column(name).map_err(wrap)?.cast(&DataType::Int64).map_err(wrap)?;
    let values = series.i64().map_err(wrap)?;
    Ok(values.into_iter().collect())
}

/// Read a column as optional floats; malformed values become None
fn float_column(df: &DataFrame, file: &str, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let wrap = |source| DataError::Csv {
        file: file.to_string(),
        source,
    };
    let series = df
        .column(name)
        .map_err(wrap)?
        .cast(&DataType::Float64)
        .map_err(wrap)?;
    let values = series.f64().map_err(wrap)?;
    Ok(values.into_iter().collect())
}

fn str_column(df: &DataFrame, file: &str, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let wrap = |source| DataError::Csv {
        file: file.to_string(),
        source,
    };
    let series = df.column(name).map_err(wrap)?.cast(&DataType::String).map_err(wrap)?;
    let values = series.str().map_err(wrap)?;
    Ok(values
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty() && *s != NULL_MARKER)
                .map(str::to_string)
        })
        .collect())
}

fn required<T>(value: Option<T>, file: &str, column: &str, row: usize) -> Result<T, DataError> {
    value.ok_or_else(|| DataError::MissingValue {
        file: file.to_string(),
        column: column.to_string(),
        row,
    })
}

pub fn load_results(path: &Path) -> Result<Vec<RaceResult>, DataError> {
    let df = read_frame(path)?;
    let file = file_label(path);

    let race_ids = int_column(&df, &file, "raceId")?;
    let driver_ids = int_column(&df, &file, "driverId")?;
    let constructor_ids = int_column(&df, &file, "constructorId")?;
    let grid = int_column(&df, &file, "grid")?;
    let position_order = int_column(&df, &file, "positionOrder")?;
    let points = float_column(&df, &file, "points")?;
    let laps = float_column(&df, &file, "laps")?;

    let mut results = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        results.push(RaceResult {
            race_id: required(race_ids[i], &file, "raceId", i)?,
            driver_id: required(driver_ids[i], &file, "driverId", i)?,
            constructor_id: required(constructor_ids[i], &file, "constructorId", i)?,
            grid: grid[i],
            position_order: position_order[i],
            points: points[i],
            laps: laps[i],
        });
    }

    Ok(results)
}

pub fn load_races(path: &Path) -> Result<Vec<Race>, DataError> {
    let df = read_frame(path)?;
    let file = file_label(path);

    let race_ids = int_column(&df, &file, "raceId")?;
    let years = int_column(&df, &file, "year")?;
    let circuit_ids = int_column(&df, &file, "circuitId")?;

    let mut races = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        races.push(Race {
            race_id: required(race_ids[i], &file, "raceId", i)?,
            year: required(years[i], &file, "year", i)? as i32,
            circuit_id: circuit_ids[i],
        });
    }

    Ok(races)
}

pub fn load_circuits(path: &Path) -> Result<Vec<Circuit>, DataError> {
    let df = read_frame(path)?;
    let file = file_label(path);

    let circuit_ids = int_column(&df, &file, "circuitId")?;
    let countries = str_column(&df, &file, "country")?;

    let mut circuits = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        circuits.push(Circuit {
            circuit_id: required(circuit_ids[i], &file, "circuitId", i)?,
            country: countries[i].clone(),
        });
    }

    Ok(circuits)
}

pub fn load_drivers(path: &Path) -> Result<Vec<Driver>, DataError> {
    let df = read_frame(path)?;
    let file = file_label(path);

    let driver_ids = int_column(&df, &file, "driverId")?;
    let forenames = str_column(&df, &file, "forename")?;
    let surnames = str_column(&df, &file, "surname")?;
    let dobs = str_column(&df, &file, "dob")?;

    let mut drivers = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        drivers.push(Driver {
            driver_id: required(driver_ids[i], &file, "driverId", i)?,
            forename: forenames[i].clone().unwrap_or_default(),
            surname: surnames[i].clone().unwrap_or_default(),
            dob: dobs[i].as_deref().and_then(parse_date),
        });
    }

    Ok(drivers)
}

pub fn load_constructors(path: &Path) -> Result<Vec<Constructor>, DataError> {
    let df = read_frame(path)?;
    let file = file_label(path);

    let constructor_ids = int_column(&df, &file, "constructorId")?;
    let names = str_column(&df, &file, "name")?;

    let mut constructors = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        constructors.push(Constructor {
            constructor_id: required(constructor_ids[i], &file, "constructorId", i)?,
            name: names[i].clone().unwrap_or_default(),
        });
    }

    Ok(constructors)
}

/// Load a standings table keyed by `id_column` (driverId or constructorId).
/// Rows with missing points are skipped.
pub fn load_standings(path: &Path, id_column: &str) -> Result<Vec<StandingSnapshot>, DataError> {
    let df = read_frame(path)?;
    let file = file_label(path);

    let race_ids = int_column(&df, &file, "raceId")?;
    let entity_ids = int_column(&df, &file, id_column)?;
    let points = float_column(&df, &file, "points")?;

    let mut standings = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        if let (Some(race_id), Some(entity_id), Some(points)) = (race_ids[i], entity_ids[i], points[i])
        {
            standings.push(StandingSnapshot {
                race_id,
                entity_id,
                points,
            });
        }
    }

    Ok(standings)
}

/// Parse a date of birth; accepts ISO (1985-01-07) and day-first (07/01/1985)
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}
