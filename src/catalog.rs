//! # Catalog Module
//!
//! Static reference data for the wave wizard: maps with their spawn taxonomy
//! and row layout, plus the week rotation. The catalog is parsed once and
//! shared read-only afterwards.
//!
//! Two on-disk shapes are understood. The nested shape (an object with `maps`
//! and `weeks`) is the live format. The flat legacy shape (an array of maps
//! with `spawnN` / `spawnN_typeM` / `spawnN_typeM_alias` keys and per-map
//! weeks) is converted to the nested shape on first load and written back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::errors::CatalogError;
use crate::storage::write_json_atomic;

/// Number of weeks in one part of the rotation
pub const WEEKS_PER_PART: u32 = 8;

/// A selectable type variant of a base spawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnVariant {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A base spawn with optional type variants
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpawnEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<SpawnVariant>,
}

impl SpawnEntry {
    /// Variants that actually carry a label
    pub fn variants(&self) -> impl Iterator<Item = &SpawnVariant> {
        self.types.iter().filter(|variant| !variant.label.is_empty())
    }

    pub fn has_variants(&self) -> bool {
        self.variants().next().is_some()
    }

    pub fn variant(&self, key: &str) -> Option<&SpawnVariant> {
        self.variants().find(|variant| variant.key == key)
    }

    /// Label committed for a variant: its alias if declared, else "<base> <variant>"
    pub fn combined_label(&self, variant: &SpawnVariant) -> String {
        match variant.alias.as_deref().filter(|alias| !alias.is_empty()) {
            Some(alias) => alias.to_string(),
            None => format!("{} {}", self.label, variant.label),
        }
    }
}

/// Spawn configuration of one map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub spawns: BTreeMap<String, SpawnEntry>,
    #[serde(default)]
    pub layout: Vec<Vec<String>>,
}

impl MapConfig {
    /// Look up a spawn whose label is defined
    pub fn spawn(&self, key: &str) -> Option<&SpawnEntry> {
        self.spawns.get(key).filter(|entry| !entry.label.is_empty())
    }

    /// Layout rows resolved to `(key, label)` pairs, skipping undefined keys and empty rows
    pub fn rows(&self) -> Vec<Vec<(&str, &str)>> {
        self.layout
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|key| {
                        self.spawn(key)
                            .map(|entry| (key.as_str(), entry.label.as_str()))
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect()
    }
}

/// One week of the rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    #[serde(deserialize_with = "code_from_string_or_number")]
    pub code: String,
    pub map: String,
    #[serde(default)]
    pub mod1: String,
    #[serde(default)]
    pub mod2: String,
}

impl Week {
    /// Part this week belongs to (first component of the code)
    pub fn part(&self) -> Option<u8> {
        parse_week_code(&self.code).map(|(part, _)| part)
    }

    pub fn index(&self) -> Option<u32> {
        parse_week_code(&self.code).map(|(_, index)| index)
    }
}

/// The whole catalog
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub maps: Vec<MapConfig>,
    #[serde(default)]
    pub weeks: Vec<Week>,
}

impl Catalog {
    /// Parse catalog text, migrating the legacy shape when needed.
    ///
    /// Returns the catalog and whether a migration happened.
    pub fn from_json(text: &str) -> Result<(Self, bool), CatalogError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.is_array() {
            let legacy: Vec<LegacyMap> = serde_json::from_value(value)?;
            return Ok((Self::from_legacy(legacy), true));
        }
        Ok((serde_json::from_value(value)?, false))
    }

    /// Labels and row layout of a map
    pub fn spawn_config(&self, slug: &str) -> Result<&MapConfig, CatalogError> {
        self.maps
            .iter()
            .find(|map| map.slug == slug)
            .ok_or_else(|| CatalogError::UnknownMap(slug.to_string()))
    }

    /// Up to eight weeks of a part, ordered by their index
    pub fn weeks_for_part(&self, part: u8) -> Vec<&Week> {
        let mut weeks: Vec<&Week> = self
            .weeks
            .iter()
            .filter(|week| week.part() == Some(part))
            .collect();
        weeks.sort_by_key(|week| week.index().unwrap_or(u32::MAX));
        weeks.truncate(WEEKS_PER_PART as usize);
        weeks
    }

    pub fn week(&self, code: &str) -> Result<&Week, CatalogError> {
        self.weeks
            .iter()
            .find(|week| week.code == code)
            .ok_or_else(|| CatalogError::UnknownWeek(code.to_string()))
    }

    /// Human-readable descriptions of references that point nowhere
    pub fn dangling_references(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for week in &self.weeks {
            if self.spawn_config(&week.map).is_err() {
                problems.push(format!("week {} references unknown map '{}'", week.code, week.map));
            }
            if parse_week_code(&week.code).is_none() {
                problems.push(format!("week code '{}' is malformed", week.code));
            }
        }
        for map in &self.maps {
            for key in map.layout.iter().flatten() {
                if map.spawn(key).is_none() {
                    problems.push(format!("map '{}' layout references undefined spawn '{}'", map.slug, key));
                }
            }
        }
        problems
    }

    fn from_legacy(entries: Vec<LegacyMap>) -> Self {
        let mut catalog = Catalog::default();

        for entry in entries {
            let mut spawns: BTreeMap<String, SpawnEntry> = BTreeMap::new();
            let mut variants: BTreeMap<String, Vec<(u32, SpawnVariant)>> = BTreeMap::new();
            let mut aliases: BTreeMap<String, String> = BTreeMap::new();

            for (key, value) in &entry.spawns {
                let Some(label) = value.as_str() else {
                    debug!(map = %entry.slug, key = %key, "Skipping non-text legacy spawn entry");
                    continue;
                };
                match LEGACY_TYPE_KEY.captures(key) {
                    Some(caps) if caps.get(3).is_some() => {
                        aliases.insert(key.trim_end_matches("_alias").to_string(), label.to_string());
                    }
                    Some(caps) => {
                        let base = caps[1].to_string();
                        let order = caps[2].parse().unwrap_or(u32::MAX);
                        variants.entry(base).or_default().push((
                            order,
                            SpawnVariant {
                                key: key.clone(),
                                label: label.to_string(),
                                alias: None,
                            },
                        ));
                    }
                    None => {
                        spawns.insert(
                            key.clone(),
                            SpawnEntry {
                                label: label.to_string(),
                                types: Vec::new(),
                            },
                        );
                    }
                }
            }

            for (base, mut list) in variants {
                list.sort_by_key(|(order, _)| *order);
                let spawn = spawns.entry(base).or_default();
                spawn.types = list
                    .into_iter()
                    .map(|(_, mut variant)| {
                        variant.alias = aliases.get(&variant.key).cloned();
                        variant
                    })
                    .collect();
            }

            let mut base_keys: Vec<&String> = spawns.keys().collect();
            base_keys.sort_by_key(|key| (trailing_number(key), (*key).clone()));
            let layout = base_keys.into_iter().map(|key| vec![key.clone()]).collect();

            for week in entry.weeks {
                catalog.weeks.push(Week {
                    code: week.code,
                    map: entry.slug.clone(),
                    mod1: week.mod1,
                    mod2: week.mod2,
                });
            }

            catalog.maps.push(MapConfig {
                slug: entry.slug,
                name: entry.name,
                spawns,
                layout,
            });
        }

        catalog
            .weeks
            .sort_by_key(|week| parse_week_code(&week.code).unwrap_or((0, 0)));
        catalog
    }
}

lazy_static! {
    static ref LEGACY_TYPE_KEY: Regex = Regex::new(r"^(.+?)_type(\d+)(_alias)?$").unwrap();
    static ref WEEK_CODE: Regex = Regex::new(r"^\s*(\d+)(?:\.(\d+))?\s*$").unwrap();
}

/// Split a week code like "1.3" into part and index
///
/// A bare number is treated as an absolute week and mapped onto its part.
pub fn parse_week_code(code: &str) -> Option<(u8, u32)> {
    let caps = WEEK_CODE.captures(code)?;
    let first: u32 = caps[1].parse().ok()?;
    match caps.get(2) {
        Some(index) => {
            let index: u32 = index.as_str().parse().ok()?;
            let part = u8::try_from(first).ok()?;
            if part == 0 || index == 0 {
                return None;
            }
            Some((part, index))
        }
        None if first > 0 => {
            let part = u8::try_from((first - 1) / WEEKS_PER_PART + 1).ok()?;
            Some((part, (first - 1) % WEEKS_PER_PART + 1))
        }
        None => None,
    }
}

/// Global sequential week number: `(part - 1) * 8 + index`
pub fn absolute_week_number(code: &str) -> Option<u32> {
    parse_week_code(code).map(|(part, index)| (u32::from(part) - 1) * WEEKS_PER_PART + index)
}

fn trailing_number(key: &str) -> u32 {
    let digits: String = key
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(u32::MAX)
}

fn code_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(code) => Ok(code),
        serde_json::Value::Number(code) => Ok(code.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "week code must be a string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct LegacyWeek {
    #[serde(deserialize_with = "code_from_string_or_number")]
    code: String,
    #[serde(default)]
    mod1: String,
    #[serde(default)]
    mod2: String,
}

#[derive(Debug, Deserialize)]
struct LegacyMap {
    name: String,
    slug: String,
    #[serde(default)]
    spawns: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    weeks: Vec<LegacyWeek>,
}

/// Loads the catalog from disk once and hands out shared references
#[derive(Debug)]
pub struct CatalogLoader {
    path: PathBuf,
    cache: OnceCell<Arc<Catalog>>,
}

impl CatalogLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    /// Build a loader that is already primed with a catalog
    pub fn with_catalog(path: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new_with(Some(Arc::new(catalog))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the catalog on first use; later calls return the cached copy.
    ///
    /// A failed parse is not cached, so the next call retries.
    pub async fn load(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.cache
            .get_or_try_init(|| async {
                let text = tokio::fs::read_to_string(&self.path)
                    .await
                    .map_err(|source| CatalogError::Io {
                        path: self.path.clone(),
                        source,
                    })?;
                let (catalog, migrated) = Catalog::from_json(&text)?;

                if migrated {
                    info!(path = %self.path.display(), maps = catalog.maps.len(), "Migrating legacy catalog to nested format");
                    if let Err(e) = write_json_atomic(&self.path, &catalog) {
                        warn!(path = %self.path.display(), error = %e, "Failed to write migrated catalog, keeping it in memory only");
                    }
                }

                for problem in catalog.dangling_references() {
                    warn!(path = %self.path.display(), problem = %problem, "Catalog inconsistency");
                }

                info!(
                    maps = catalog.maps.len(),
                    weeks = catalog.weeks.len(),
                    "Catalog loaded"
                );
                Ok::<_, CatalogError>(Arc::new(catalog))
            })
            .await
            .cloned()
    }
}
