//=========================================================================
// Asset System
//=========================================================================
//
// Load/unload bookkeeping for engine-managed resources.
//
// Architecture:
//   AssetRegistry
//     ├─ handles: HashMap<String, AssetHandle>
//     └─ order:   Vec<String>            (registration order)
//
//   AssetHandle ──load()/unload()──> dyn AssetManager (host seam)
//
// The registry never owns asset data. Data lives in the asset manager;
// handles only remember whether they asked the manager for it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{Any, TypeId};
use std::collections::HashMap;

use log::debug;

//=== Module Declarations =================================================

mod file_manager;

//=== Public API ==========================================================

pub use file_manager::FileAssetManager;

//=== AssetDescriptor =====================================================

/// Identifies one loadable asset: its file name and the type it is
/// loaded as.
///
/// Two descriptors are equal iff both the file name and the asset type
/// match.
#[derive(Debug, Clone)]
pub struct AssetDescriptor {
    file_name: String,
    type_id: TypeId,
    type_name: &'static str,
}

impl AssetDescriptor {
    /// Describes `file_name` loaded as an asset of type `T`.
    pub fn of<T: Any>(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for AssetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.file_name == other.file_name && self.type_id == other.type_id
    }
}

impl Eq for AssetDescriptor {}

//=== AssetManager Trait ==================================================

/// Host asset-loading subsystem.
///
/// Loading is logically asynchronous: `load` only queues a request and
/// `update` is polled once per frame to make progress. Assets are keyed
/// by file name.
pub trait AssetManager {
    /// Queues `descriptor` for loading.
    fn load(&mut self, descriptor: &AssetDescriptor);

    /// Releases one load request for `file_name`.
    fn unload(&mut self, file_name: &str);

    /// Whether `file_name` is fully loaded and available via `get`.
    fn is_loaded(&self, file_name: &str) -> bool;

    /// Returns the loaded asset, if ready.
    fn get(&self, file_name: &str) -> Option<&dyn Any>;

    /// Why `file_name` could not be loaded, once its load has failed.
    fn failure(&self, file_name: &str) -> Option<String>;

    /// Makes loading progress. Returns true once nothing is pending.
    fn update(&mut self) -> bool;

    /// Releases every asset and any background resources.
    fn dispose(&mut self);
}

//=== AssetHandle =========================================================

/// Load/unload wrapper around one registered asset.
///
/// `requested` flips to true on the first `load` and back to false on
/// `unload`, so both calls are idempotent.
#[derive(Debug, Clone)]
pub struct AssetHandle {
    descriptor: AssetDescriptor,
    requested: bool,
}

impl AssetHandle {
    pub fn new(descriptor: AssetDescriptor) -> Self {
        Self { descriptor, requested: false }
    }

    pub fn descriptor(&self) -> &AssetDescriptor {
        &self.descriptor
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Asks the manager to begin loading, once.
    pub fn load(&mut self, manager: &mut dyn AssetManager) {
        if !self.requested {
            debug!(target: "stagehand::asset", "Requesting {}", self.descriptor.file_name);
            manager.load(&self.descriptor);
            self.requested = true;
        }
    }

    /// Asks the manager to release the asset, if it was requested.
    pub fn unload(&mut self, manager: &mut dyn AssetManager) {
        if self.requested {
            debug!(target: "stagehand::asset", "Releasing {}", self.descriptor.file_name);
            manager.unload(&self.descriptor.file_name);
            self.requested = false;
        }
    }

    pub fn is_ready(&self, manager: &dyn AssetManager) -> bool {
        manager.is_loaded(&self.descriptor.file_name)
    }
}

impl PartialEq for AssetHandle {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

//=== AssetRegistry =======================================================

/// Maps asset refs to their handles, in registration order.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    handles: HashMap<String, AssetHandle>,
    order: Vec<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.handles.contains_key(reference)
    }

    /// Whether an equal handle is already registered under any ref.
    pub fn contains_handle(&self, handle: &AssetHandle) -> bool {
        self.handles.values().any(|h| h == handle)
    }

    /// Whether any handle, of any type, loads `file_name`.
    pub fn contains_file(&self, file_name: &str) -> bool {
        self.handles
            .values()
            .any(|h| h.descriptor().file_name() == file_name)
    }

    pub fn get(&self, reference: &str) -> Option<&AssetHandle> {
        self.handles.get(reference)
    }

    pub fn get_mut(&mut self, reference: &str) -> Option<&mut AssetHandle> {
        self.handles.get_mut(reference)
    }

    /// Inserts or replaces the handle under `reference`.
    pub fn insert(&mut self, reference: String, handle: AssetHandle) {
        if self.handles.insert(reference.clone(), handle).is_none() {
            self.order.push(reference);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn refs(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    //--- Bulk Operations --------------------------------------------------

    /// Loads every handle named in `refs`. Unknown refs are skipped.
    pub fn load_all(&mut self, refs: &[String], manager: &mut dyn AssetManager) {
        for reference in refs {
            if let Some(handle) = self.handles.get_mut(reference) {
                handle.load(manager);
            }
        }
    }

    /// Unloads every handle named in `refs` that is not named in `keep`.
    pub fn unload_except(
        &mut self,
        refs: &[String],
        keep: &[&String],
        manager: &mut dyn AssetManager,
    ) {
        for reference in refs {
            if keep.contains(&reference) {
                continue;
            }
            if let Some(handle) = self.handles.get_mut(reference) {
                handle.unload(manager);
            }
        }
    }

    /// First requested asset, in registration order, whose load failed.
    ///
    /// Returns the asset's ref, its file name and the failure reason.
    pub fn first_failure(&self, manager: &dyn AssetManager) -> Option<(&str, &str, String)> {
        self.order.iter().find_map(|reference| {
            let handle = self.handles.get(reference)?;
            if !handle.is_requested() {
                return None;
            }
            let file_name = handle.descriptor().file_name();
            manager
                .failure(file_name)
                .map(|reason| (reference.as_str(), file_name, reason))
        })
    }

    /// Load progress of the assets named in `refs`, in `[0, 1]`.
    ///
    /// Computed as `(1 + ready) / (1 + total)` so a screen with no
    /// assets reports completion immediately.
    pub fn progress(&self, refs: &[String], manager: &dyn AssetManager) -> f32 {
        let total = refs.len() + 1;
        let ready = 1 + refs
            .iter()
            .filter_map(|r| self.handles.get(r))
            .filter(|h| h.is_ready(manager))
            .count();
        ready as f32 / total as f32
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualAssets;

    struct Texture;
    struct Sound;

    fn refs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    //=====================================================================
    // AssetDescriptor Tests
    //=====================================================================

    #[test]
    fn descriptor_equality_uses_file_and_type() {
        let a = AssetDescriptor::of::<Texture>("hero.png");
        let b = AssetDescriptor::of::<Texture>("hero.png");
        let c = AssetDescriptor::of::<Sound>("hero.png");
        let d = AssetDescriptor::of::<Texture>("villain.png");

        assert_eq!(a, b);
        assert_ne!(a, c, "Same file as another type is a different asset");
        assert_ne!(a, d);
    }

    //=====================================================================
    // AssetHandle Tests
    //=====================================================================

    #[test]
    fn load_is_idempotent() {
        let mut manager = ManualAssets::new();
        let mut handle = AssetHandle::new(AssetDescriptor::of::<Texture>("hero.png"));

        handle.load(&mut manager);
        handle.load(&mut manager);

        assert!(handle.is_requested());
        assert_eq!(manager.load_calls("hero.png"), 1);
    }

    #[test]
    fn unload_without_load_is_noop() {
        let mut manager = ManualAssets::new();
        let mut handle = AssetHandle::new(AssetDescriptor::of::<Texture>("hero.png"));

        handle.unload(&mut manager);

        assert_eq!(manager.unload_calls("hero.png"), 0);
    }

    #[test]
    fn unload_clears_request() {
        let mut manager = ManualAssets::new();
        let mut handle = AssetHandle::new(AssetDescriptor::of::<Texture>("hero.png"));

        handle.load(&mut manager);
        handle.unload(&mut manager);
        handle.unload(&mut manager);

        assert!(!handle.is_requested());
        assert_eq!(manager.unload_calls("hero.png"), 1);
    }

    #[test]
    fn is_ready_delegates_to_manager() {
        let mut manager = ManualAssets::new();
        let mut handle = AssetHandle::new(AssetDescriptor::of::<Texture>("hero.png"));

        handle.load(&mut manager);
        assert!(!handle.is_ready(&manager));

        manager.finish("hero.png");
        assert!(handle.is_ready(&manager));
    }

    //=====================================================================
    // AssetRegistry Tests
    //=====================================================================

    #[test]
    fn progress_without_assets_is_complete() {
        let manager = ManualAssets::new();
        let registry = AssetRegistry::new();
        assert_eq!(registry.progress(&[], &manager), 1.0);
    }

    #[test]
    fn progress_rises_with_each_ready_asset() {
        let mut manager = ManualAssets::new();
        let mut registry = AssetRegistry::new();
        registry.insert("a".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("a.png")));
        registry.insert("b".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("b.png")));
        let names = refs(&["a", "b"]);

        registry.load_all(&names, &mut manager);
        let start = registry.progress(&names, &manager);
        assert!((start - 1.0 / 3.0).abs() < f32::EPSILON);

        manager.finish("a.png");
        let middle = registry.progress(&names, &manager);
        assert!(middle > start);
        assert!(middle < 1.0);

        manager.finish("b.png");
        assert_eq!(registry.progress(&names, &manager), 1.0);
    }

    #[test]
    fn unload_except_keeps_shared_refs() {
        let mut manager = ManualAssets::new();
        let mut registry = AssetRegistry::new();
        registry.insert("a".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("a.png")));
        registry.insert("b".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("b.png")));
        let names = refs(&["a", "b"]);
        registry.load_all(&names, &mut manager);

        let shared = "b".to_string();
        registry.unload_except(&names, &[&shared], &mut manager);

        assert!(!registry.get("a").unwrap().is_requested());
        assert!(registry.get("b").unwrap().is_requested());
    }

    #[test]
    fn first_failure_reports_requested_assets_only() {
        let mut manager = ManualAssets::new();
        let mut registry = AssetRegistry::new();
        registry.insert("a".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("a.png")));
        registry.insert("b".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("b.png")));

        manager.fail("a.png", "corrupt");
        assert!(registry.first_failure(&manager).is_none(), "Unrequested failures are ignored");

        registry.load_all(&refs(&["a"]), &mut manager);
        manager.fail("a.png", "corrupt");

        let (reference, file_name, reason) = registry.first_failure(&manager).unwrap();
        assert_eq!((reference, file_name, reason.as_str()), ("a", "a.png", "corrupt"));
    }

    #[test]
    fn contains_handle_detects_equal_descriptor() {
        let mut registry = AssetRegistry::new();
        registry.insert("a".into(), AssetHandle::new(AssetDescriptor::of::<Texture>("a.png")));

        let same = AssetHandle::new(AssetDescriptor::of::<Texture>("a.png"));
        let other = AssetHandle::new(AssetDescriptor::of::<Sound>("a.png"));

        assert!(registry.contains_handle(&same));
        assert!(!registry.contains_handle(&other));
        assert!(registry.contains_file(other.descriptor().file_name()));
        assert!(!registry.contains_file("b.png"));
        assert_eq!(registry.refs().collect::<Vec<_>>(), vec!["a"]);
    }
}
