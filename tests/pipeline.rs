//! Load -> features -> train -> persist -> predict, end to end on CSV fixtures

mod common;

use common::{Fixture, FIRST_SEASON, LAST_SEASON, RACES_PER_SEASON, UPSET_SEASON};
use paddock::data::FeatureEngineering;
use paddock::trainer::train_task;
use paddock::{Analytics, FeatureTables, ModelStore, Predictor, Task};

#[test]
fn test_load_fixture_tables() {
    let fixture = Fixture::new();
    let tables = fixture.tables();

    let seasons = (LAST_SEASON - FIRST_SEASON + 1) as usize;
    assert_eq!(tables.races.len(), seasons * RACES_PER_SEASON as usize);
    assert_eq!(tables.results.len(), seasons * RACES_PER_SEASON as usize * 4 + 1);
    assert_eq!(tables.drivers.len(), 5);
    assert_eq!(tables.driver(4).unwrap().dob, None);
    assert_eq!(tables.circuit(2).unwrap().country.as_deref(), Some("UK"));
    assert_eq!(tables.latest_season(), Some(LAST_SEASON));
}

#[test]
fn test_feature_tables_from_fixture() {
    let fixture = Fixture::new();
    let tables = fixture.tables();
    let features = FeatureTables::build(&tables);

    // Four regular drivers every season plus driver 5 in the first season
    assert_eq!(features.drivers.len(), 41);
    assert_eq!(features.constructors.len(), 20);

    for season in FIRST_SEASON..=LAST_SEASON {
        let champions: Vec<i64> = features
            .drivers_in_season(season)
            .iter()
            .filter(|r| r.is_champion == 1)
            .map(|r| r.driver_id)
            .collect();
        let expected = if season == UPSET_SEASON { 2 } else { 1 };
        assert_eq!(champions, vec![expected], "season {}", season);
    }

    let hamilton_2020 = features
        .drivers
        .iter()
        .find(|r| r.season == 2020 && r.driver_id == 1)
        .unwrap();
    assert_eq!(hamilton_2020.total_points, 75.0);
    assert_eq!(hamilton_2020.best_position, 1.0);
    assert_eq!(hamilton_2020.seasons_experience, 10.0);
    assert_eq!(hamilton_2020.age, 35.0);

    let ricciardo = features.drivers.iter().find(|r| r.driver_id == 4).unwrap();
    assert_eq!(ricciardo.age, 0.0);

    let red_bull_2015 = features
        .constructors
        .iter()
        .find(|r| r.season == FIRST_SEASON && r.constructor_id == 20)
        .unwrap();
    assert_eq!(red_bull_2015.num_drivers, 3.0);
    assert_eq!(red_bull_2015.is_champion, 0);

    // Same input, same rows
    assert_eq!(FeatureTables::build(&tables).drivers, features.drivers);
}

#[test]
fn test_raw_samples_from_fixture() {
    let fixture = Fixture::new();
    let tables = fixture.tables();

    let podium = FeatureEngineering::podium_samples(&tables);
    assert_eq!(podium.len(), tables.results.len());
    assert_eq!(podium.iter().filter(|s| s.is_podium == 1).count(), 90);

    let points = FeatureEngineering::season_points_samples(&tables);
    assert_eq!(points.len(), 41);
    assert_eq!(points.iter().filter(|s| s.is_champion == 1).count(), 10);
}

#[test]
fn test_train_save_load_predict() {
    let fixture = Fixture::new();
    let tables = fixture.tables();
    let features = FeatureTables::build(&tables);
    let store = ModelStore::new(fixture.model_dir.path());

    for task in Task::ALL {
        let (model, report) = train_task(task, &tables, &features).unwrap();
        assert_eq!(report.task, task);
        assert!(report.test_rows > 0);
        assert!((0.0..=1.0).contains(&report.test_metrics.accuracy));
        assert_eq!(model.scaler.is_some(), task.is_scaled());
        store.save(&model).unwrap();
    }

    assert_eq!(store.available(), Task::ALL.to_vec());
    assert!(fixture.model_dir.path().join("wdc_scaler.json").exists());
    assert!(!fixture.model_dir.path().join("podium_scaler.json").exists());

    let predictor = Predictor::load(&store);
    assert_eq!(predictor.loaded_tasks().len(), 4);

    let predictions = predictor
        .predict_championships(2025, &features, None, &tables)
        .unwrap();
    assert_eq!(predictions.snapshot_season, Some(LAST_SEASON));
    assert_eq!(predictions.drivers.len(), 4);
    assert_eq!(predictions.constructors.len(), 2);
    assert!(predictions
        .drivers
        .windows(2)
        .all(|w| w[0].probability >= w[1].probability));
    assert_eq!(predictions.constructors[0].entity_id, 10);
    assert_eq!(predictions.constructors[0].entity_name, "Mercedes");
    for result in predictions.drivers.iter().chain(&predictions.constructors) {
        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(result.label == 1, result.probability >= 0.5);
    }
}

#[test]
fn test_failed_training_writes_nothing() {
    let fixture = Fixture::new();
    let tables = fixture.tables();
    let store = ModelStore::new(fixture.model_dir.path());

    // No champion anywhere in a single-season slice of one driver
    let rows: Vec<_> = FeatureTables::build(&tables)
        .drivers
        .into_iter()
        .filter(|r| r.driver_id == 4)
        .collect();
    assert!(paddock::train(Task::Wdc, &rows).is_err());
    assert!(store.available().is_empty());
}

#[test]
fn test_analytics_on_fixture() {
    let fixture = Fixture::new();
    let tables = fixture.tables();
    let history = paddock::data::ResultHistoryIndex::build(&tables);
    let analytics = Analytics::new(&tables, &history);

    let active: Vec<i64> = analytics
        .active_drivers(LAST_SEASON, 5)
        .iter()
        .map(|d| d.driver_id)
        .collect();
    assert_eq!(active, vec![1, 2, 3, 4]);

    let seasons = analytics.seasons();
    assert_eq!(seasons.len(), 10);
    assert_eq!(seasons[0], LAST_SEASON);

    let projection = analytics.project_driver(1, 2025).unwrap();
    assert_eq!(projection.based_on_races, Some(9));
    assert_eq!(projection.predictions.points, 22.5);
}
