use anyhow::Result;
use serde_json::{json, Value};

use waves::errors::{ShapeError, StorageError};
use waves::storage::{ConfigStore, SavedWaves, MAX_WAVES, SPAWNS_PER_WAVE};

fn sample_waves() -> Vec<Vec<String>> {
    (1..=MAX_WAVES)
        .map(|wave| {
            (1..=SPAWNS_PER_WAVE)
                .map(|slot| format!("Spawn {wave}.{slot}"))
                .collect()
        })
        .collect()
}

fn sample_payload() -> SavedWaves {
    SavedWaves {
        week: "1.3".to_string(),
        absolute_week: Some(3),
        slug: "coastal-reach".to_string(),
        map: "Coastal Reach".to_string(),
        mod1: "Fog".to_string(),
        mod2: "Double Spawn".to_string(),
        waves: sample_waves(),
    }
}

fn write_raw(value: &Value) -> Result<(tempfile::TempDir, ConfigStore)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("waves.json");
    std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
    Ok((dir, ConfigStore::new(path)))
}

#[test]
fn test_write_then_read_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ConfigStore::new(dir.path().join("json").join("waves.json"));
    let payload = sample_payload();

    store.write(&payload)?;
    assert_eq!(store.read()?, payload);

    // No temp file is left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("json"))?.collect::<Result<_, _>>()?;
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[test]
fn test_write_replaces_previous_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ConfigStore::new(dir.path().join("waves.json"));

    store.write(&sample_payload())?;
    let mut second = sample_payload();
    second.week = "2.1".to_string();
    second.absolute_week = Some(9);
    second.waves[14][2] = "Lighthouse".to_string();
    store.write(&second)?;

    assert_eq!(store.read()?, second);
    Ok(())
}

#[test]
fn test_persisted_field_names() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = ConfigStore::new(dir.path().join("waves.json"));
    store.write(&sample_payload())?;

    let value: Value = serde_json::from_str(&std::fs::read_to_string(store.path())?)?;
    let mut keys: Vec<&str> = value
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["absolute_week", "map", "mod1", "mod2", "slug", "waves", "week"]
    );
    Ok(())
}

#[test]
fn test_read_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = ConfigStore::new(dir.path().join("absent.json"));
    assert!(matches!(store.read(), Err(StorageError::NotFound(_))));
}

#[test]
fn test_read_unparsable_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("waves.json");
    std::fs::write(&path, "{\"week\": \"1.3\", ")?;

    assert!(matches!(ConfigStore::new(path).read(), Err(StorageError::Unparsable(_))));
    Ok(())
}

#[test]
fn test_read_without_waves_key() -> Result<()> {
    let (_dir, store) = write_raw(&json!({
        "week": "1.3", "absolute_week": 3, "slug": "coastal-reach",
        "map": "Coastal Reach", "mod1": "Fog", "mod2": "Double Spawn"
    }))?;

    match store.read() {
        Err(StorageError::Invalid(ShapeError::MissingFields(fields))) => {
            assert_eq!(fields, vec!["waves".to_string()]);
        }
        other => panic!("unexpected result {other:?}"),
    }
    let message = store.read().unwrap_err().to_string();
    assert!(message.contains("missing field"), "{message}");
    Ok(())
}

#[test]
fn test_read_wave_with_two_entries() -> Result<()> {
    let mut waves = sample_waves();
    waves[6].pop();
    let (_dir, store) = write_raw(&json!({
        "week": "1.3", "absolute_week": 3, "slug": "coastal-reach",
        "map": "Coastal Reach", "mod1": "Fog", "mod2": "Double Spawn",
        "waves": waves
    }))?;

    match store.read() {
        Err(StorageError::Invalid(ShapeError::WrongSlotCount { wave, expected, found })) => {
            assert_eq!((wave, expected, found), (7, 3, 2));
        }
        other => panic!("unexpected result {other:?}"),
    }
    let message = store.read().unwrap_err().to_string();
    assert!(message.contains("wrong slot count"), "{message}");
    Ok(())
}

#[test]
fn test_read_wrong_wave_count() -> Result<()> {
    let mut waves = sample_waves();
    waves.truncate(14);
    let (_dir, store) = write_raw(&json!({
        "week": "1.3", "slug": "coastal-reach", "map": "Coastal Reach",
        "mod1": "Fog", "mod2": "Double Spawn", "waves": waves
    }))?;

    assert!(matches!(
        store.read(),
        Err(StorageError::Invalid(ShapeError::WrongWaveCount { expected: 15, found: 14 }))
    ));
    Ok(())
}

#[test]
fn test_read_tolerates_missing_or_null_absolute_week() -> Result<()> {
    let (_dir, store) = write_raw(&json!({
        "week": "1.3", "absolute_week": null, "slug": "coastal-reach",
        "map": "Coastal Reach", "mod1": "Fog", "mod2": "Double Spawn",
        "waves": sample_waves()
    }))?;
    assert_eq!(store.read()?.absolute_week, None);

    let (_dir, store) = write_raw(&json!({
        "week": 3, "slug": "coastal-reach",
        "map": "Coastal Reach", "mod1": "Fog", "mod2": "Double Spawn",
        "waves": sample_waves()
    }))?;
    let saved = store.read()?;
    assert_eq!(saved.week, "3");
    assert_eq!(saved.absolute_week, None);
    Ok(())
}

#[test]
fn test_read_rejects_non_object() -> Result<()> {
    let (_dir, store) = write_raw(&json!([1, 2, 3]))?;
    assert!(matches!(store.read(), Err(StorageError::Invalid(ShapeError::NotAnObject))));
    Ok(())
}

#[test]
fn test_read_rejects_empty_spawn_label() -> Result<()> {
    let mut waves = sample_waves();
    waves[3][1] = String::new();
    let (_dir, store) = write_raw(&json!({
        "week": "1.3", "absolute_week": 3, "slug": "coastal-reach",
        "map": "Coastal Reach", "mod1": "Fog", "mod2": "Double Spawn",
        "waves": waves
    }))?;

    assert!(matches!(
        store.read(),
        Err(StorageError::Invalid(ShapeError::EmptySpawn { wave: 4, slot: 2 }))
    ));
    Ok(())
}
