use serde_json::Value;

use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_backfill_interval_days", m002_backfill_interval_days),
    ]
}

/// Applies pending migrations in order.
///
/// Every migration must be idempotent: a crash between the migration and
/// `set_version` replays it on the next start. Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("stored version has {} bytes, expected 4", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Entries written before `interval_days` existed get the 1-day default.
fn m002_backfill_interval_days(store: &Store) -> Result<(), StoreError> {
    let mut patched = 0usize;

    for item in store.learner_states.iter() {
        let (key, raw) = item?;
        let mut state: Value = match Store::deserialize(&raw) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(error = %error, "Skipping unreadable learner state during backfill");
                continue;
            }
        };

        let mut changed = false;
        if let Some(Value::Object(srs)) = state.get_mut("srs") {
            for entry in srs.values_mut() {
                if let Value::Object(fields) = entry {
                    if !fields.contains_key("interval_days") {
                        fields.insert("interval_days".to_string(), Value::from(1));
                        changed = true;
                    }
                }
            }
        }

        if changed {
            store.learner_states.insert(key, Store::serialize(&state)?)?;
            patched += 1;
        }
    }

    tracing::info!(patched, "Backfilled interval_days");
    Ok(())
}
