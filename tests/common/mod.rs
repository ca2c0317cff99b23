//! Shared CSV fixtures for the integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use paddock::data::RawTables;
use paddock::trainer::train_task;
use paddock::{AppConfig, AppContext, FeatureTables, ModelStore, Predictor, Task};
use tempfile::TempDir;

pub const FIRST_SEASON: i32 = 2015;
pub const LAST_SEASON: i32 = 2024;
pub const RACES_PER_SEASON: i64 = 3;
/// Only season in which driver 2 beats driver 1
pub const UPSET_SEASON: i32 = 2018;

const POINTS: [f64; 5] = [25.0, 18.0, 15.0, 12.0, 0.0];

fn constructor_of(driver_id: i64) -> i64 {
    if driver_id <= 2 {
        10
    } else {
        20
    }
}

fn finishing_order(season: i32) -> [i64; 4] {
    if season == UPSET_SEASON {
        [2, 1, 3, 4]
    } else {
        [1, 3, 2, 4]
    }
}

/// Ten seasons, three races each. Drivers 1 and 2 drive for constructor 10,
/// drivers 3 and 4 for constructor 20. Driver 5 starts a single race in 2015.
pub fn write_fixture(dir: &Path) {
    let mut races = String::from("raceId,year,round,circuitId,name\n");
    let mut results =
        String::from("resultId,raceId,driverId,constructorId,grid,positionOrder,points,laps\n");
    let mut driver_standings = String::from("driverStandingsId,raceId,driverId,points,position\n");
    let mut constructor_standings =
        String::from("constructorStandingsId,raceId,constructorId,points,position\n");

    let mut result_id = 0;
    let mut standing_id = 0;
    for season in FIRST_SEASON..=LAST_SEASON {
        let mut driver_totals: BTreeMap<i64, f64> = BTreeMap::new();
        let mut team_totals: BTreeMap<i64, f64> = BTreeMap::new();

        for round in 1..=RACES_PER_SEASON {
            let race_id = (season - FIRST_SEASON) as i64 * RACES_PER_SEASON + round;
            let circuit_id = if round % 2 == 0 { 2 } else { 1 };
            writeln!(races, "{},{},{},{},Grand Prix {}", race_id, season, round, circuit_id, round).unwrap();

            let mut order = finishing_order(season).to_vec();
            if season == FIRST_SEASON && round == 1 {
                order.push(5);
            }

            for (i, &driver_id) in order.iter().enumerate() {
                result_id += 1;
                let position = i as i64 + 1;
                let points = POINTS[i];
                let constructor_id = constructor_of(driver_id);
                writeln!(
                    results,
                    "{},{},{},{},{},{},{},{}",
                    result_id, race_id, driver_id, constructor_id, position, position, points, 50
                )
                .unwrap();

                *driver_totals.entry(driver_id).or_default() += points;
                *team_totals.entry(constructor_id).or_default() += points;
            }

            for (driver_id, total) in &driver_totals {
                standing_id += 1;
                writeln!(driver_standings, "{},{},{},{},0", standing_id, race_id, driver_id, total).unwrap();
            }
            for (constructor_id, total) in &team_totals {
                standing_id += 1;
                writeln!(
                    constructor_standings,
                    "{},{},{},{},0",
                    standing_id, race_id, constructor_id, total
                )
                .unwrap();
            }
        }
    }

    fs::write(dir.join("races.csv"), races).unwrap();
    fs::write(dir.join("results.csv"), results).unwrap();
    fs::write(dir.join("driver_standings.csv"), driver_standings).unwrap();
    fs::write(dir.join("constructor_standings.csv"), constructor_standings).unwrap();
    fs::write(
        dir.join("circuits.csv"),
        "circuitId,circuitRef,name,location,country\n\
         1,monza,Autodromo Nazionale di Monza,Monza,Italy\n\
         2,silverstone,Silverstone Circuit,Silverstone,UK\n",
    )
    .unwrap();
    fs::write(
        dir.join("drivers.csv"),
        "driverId,driverRef,forename,surname,dob\n\
         1,hamilton,Lewis,Hamilton,1985-01-07\n\
         2,rosberg,Nico,Rosberg,1985-06-27\n\
         3,vettel,Sebastian,Vettel,1987-07-03\n\
         4,ricciardo,Daniel,Ricciardo,\\N\n\
         5,button,Jenson,Button,1980-01-19\n",
    )
    .unwrap();
    fs::write(
        dir.join("constructors.csv"),
        "constructorId,constructorRef,name\n\
         10,mercedes,Mercedes\n\
         20,red_bull,Red Bull\n",
    )
    .unwrap();
}

pub struct Fixture {
    pub data_dir: TempDir,
    pub model_dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let data_dir = TempDir::new().unwrap();
        write_fixture(data_dir.path());
        Self {
            data_dir,
            model_dir: TempDir::new().unwrap(),
        }
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            data_dir: self.data_dir.path().to_path_buf(),
            model_dir: self.model_dir.path().to_path_buf(),
            ..AppConfig::default()
        }
    }

    pub fn tables(&self) -> RawTables {
        RawTables::load(self.data_dir.path()).unwrap()
    }

    /// Train and save every task's model
    pub fn train_all(&self) {
        let tables = self.tables();
        let features = FeatureTables::build(&tables);
        let store = ModelStore::new(self.model_dir.path());
        for task in Task::ALL {
            let (model, _) = train_task(task, &tables, &features).unwrap();
            store.save(&model).unwrap();
        }
    }

    /// Context with every model trained and loaded
    pub fn trained_context(&self) -> AppContext {
        self.train_all();
        AppContext::load(self.config()).unwrap()
    }

    /// Context with no models
    pub fn untrained_context(&self) -> AppContext {
        AppContext::new(self.config(), self.tables(), Predictor::new())
    }
}
