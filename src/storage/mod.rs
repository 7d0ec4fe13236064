//=========================================================================
// Storage
//=========================================================================
//
// Persistence helpers outside the screen lifecycle:
//
// - `prefs`: maps the fields of a settings record onto a key-value
//   preference store.
// - `records`: saves lists of records as JSON payloads in an XML file.
//
//=========================================================================

pub mod prefs;
pub mod records;

pub use prefs::{FilePreferences, MemoryPreferences, PrefValue, PreferenceMapper, PreferenceStore};
pub use records::{RecordSerializer, SaveData};
