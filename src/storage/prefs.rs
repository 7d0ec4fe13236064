//=========================================================================
// Preferences
//=========================================================================
//
// Key-value preference stores and a mapper that copies the fields of a
// plain settings record in and out of one.
//
// Architecture:
//   PreferenceMapper<R, S>
//     ├─ record: R            (Serialize + DeserializeOwned + Default)
//     └─ store:  S            (dyn-free PreferenceStore)
//
//   record ──serde_json::Value──> fields ──PrefValue──> store
//
// A field is a top-level member of the record's JSON object. Only
// scalar members are stored; arrays, objects and nulls are skipped.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

//=== Internal Dependencies ===============================================

use crate::error::StorageError;

//=== PrefValue ===========================================================

/// One stored preference.
///
/// Integer and long fields share the 64-bit `Integer` slot; single
/// characters are stored as one-character strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PrefValue {
    /// Converts a scalar JSON value. Returns `None` for anything else.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Converts back to JSON. Non-finite floats have no JSON form.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Boolean(b) => Some(Value::Bool(*b)),
            Self::Integer(i) => Some(Value::from(*i)),
            Self::Float(f) => Number::from_f64(*f).map(Value::Number),
            Self::String(s) => Some(Value::String(s.clone())),
        }
    }

    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

//=== PreferenceStore Trait ===============================================

/// Named key-value store that persists on `flush`.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<PrefValue>;

    fn put(&mut self, key: &str, value: PrefValue);

    /// Persists every `put` so far.
    fn flush(&mut self) -> Result<(), StorageError>;
}

//=== MemoryPreferences ===================================================

/// Store that keeps values in memory only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPreferences {
    values: BTreeMap<String, PrefValue>,
    flushes: usize,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `flush` calls so far.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.flushes += 1;
        Ok(())
    }
}

//=== FilePreferences =====================================================

/// Store backed by one JSON file, `<dir>/<name>.json`.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, PrefValue>,
}

impl FilePreferences {
    /// Opens store `name` under `dir`, reading the file if it exists.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::format("prefs name is not empty"));
        }

        let path = dir.as_ref().join(format!("{}.json", name));
        let values = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            BTreeMap::new()
        };

        debug!(
            target: "stagehand::storage",
            "Opened preferences {} ({} values)",
            path.display(),
            values.len()
        );
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.values)?;
        writer.flush()?;

        debug!(target: "stagehand::storage", "Flushed preferences {}", self.path.display());
        Ok(())
    }
}

//=== PreferenceMapper ====================================================

/// Keeps a settings record in sync with a [`PreferenceStore`].
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use stagehand::storage::{MemoryPreferences, PreferenceMapper};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct Settings {
///     volume: f64,
///     muted: bool,
/// }
///
/// let mut prefs = PreferenceMapper::<Settings, _>::new(MemoryPreferences::new()).unwrap();
/// prefs.record_mut().volume = 0.8;
/// prefs.save().unwrap();
/// ```
pub struct PreferenceMapper<R, S> {
    record: R,
    store: S,
}

impl<R, S> PreferenceMapper<R, S>
where
    R: Serialize + DeserializeOwned + Default,
    S: PreferenceStore,
{
    /// Builds the record from `store`.
    ///
    /// Each field takes the stored value of the same kind, or keeps its
    /// value from `R::default()` when the key is missing or holds a value
    /// of another kind.
    pub fn new(store: S) -> Result<Self, StorageError> {
        let defaults = fields_of(&R::default())?;

        let mut fields = Map::with_capacity(defaults.len());
        for (name, default) in defaults {
            let value = match PrefValue::from_json(&default) {
                Some(expected) => match store.get(&name) {
                    Some(stored) if stored.same_kind(&expected) => {
                        stored.to_json().unwrap_or(default)
                    }
                    _ => default,
                },
                None => {
                    trace!(target: "stagehand::storage", "Field {} is not stored", name);
                    default
                }
            };
            fields.insert(name, value);
        }

        let record = serde_json::from_value(Value::Object(fields))?;
        Ok(Self { record, store })
    }

    /// Writes every storable field to the store, then flushes it.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let fields = fields_of(&self.record)?;
        for (name, value) in &fields {
            if let Some(value) = PrefValue::from_json(value) {
                self.store.put(name, value);
            }
        }
        self.store.flush()
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

fn fields_of<R: Serialize>(record: &R) -> Result<Map<String, Value>, StorageError> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(StorageError::format("record serializes to an object")),
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
