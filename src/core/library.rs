//=========================================================================
// Content Library
//=========================================================================
//
// Named store for long-lived user objects that outlive any one screen
// (shared fonts, save slots, audio banks...).
//
// Each content gets `initialize`, `load`, `unload` and `dispose` hooks.
// The library tracks which ones ran and can drive all contents at once;
// contents marked independent are skipped by those batch calls and are
// managed by hand.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::collections::HashMap;

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::checks::DebugChecks;
use crate::error::GameError;

//=== Content Trait =======================================================

/// A long-lived object kept in a [`Library`].
pub trait Content: 'static {
    fn initialize(&mut self) {}

    /// Makes the content usable.
    fn load(&mut self) {}

    /// Releases what `load` acquired; the content may be loaded again.
    fn unload(&mut self) {}

    fn dispose(&mut self) {}
}

trait StoredContent: Content {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Content> StoredContent for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//=== Shelf ===============================================================

struct Shelf {
    content: Box<dyn StoredContent>,
    independent: bool,
    initialized: bool,
    loaded: bool,
}

impl Shelf {
    fn initialize(&mut self) {
        if !self.initialized {
            self.content.initialize();
            self.initialized = true;
        }
    }

    fn load(&mut self) {
        if !self.loaded {
            self.content.load();
            self.loaded = true;
        }
    }

    fn unload(&mut self) {
        if self.loaded {
            self.content.unload();
            self.loaded = false;
        }
    }
}

//=== Library =============================================================

/// Contents by ref, in insertion order.
pub struct Library {
    shelves: HashMap<String, Shelf>,
    order: Vec<String>,
    checks: DebugChecks,
}

impl Library {
    pub fn new(checks: DebugChecks) -> Self {
        Self {
            shelves: HashMap::new(),
            order: Vec::new(),
            checks,
        }
    }

    pub(crate) fn set_checks_enabled(&mut self, enabled: bool) {
        self.checks.set_enabled(enabled);
    }

    //--- Storage ----------------------------------------------------------

    /// Stores `content` under `reference`. The ref must be unique.
    pub fn set_content<T: Content>(&mut self, reference: &str, content: T) -> Result<(), GameError> {
        let reference = self.checks.ensure_ref("content ref is not empty", reference)?;
        self.checks
            .ensure("content ref is unique", !self.shelves.contains_key(reference))?;

        debug!(target: "stagehand::game", "Library stores {}", reference);
        let shelf = Shelf {
            content: Box::new(content),
            independent: false,
            initialized: false,
            loaded: false,
        };
        if self.shelves.insert(reference.to_string(), shelf).is_none() {
            self.order.push(reference.to_string());
        }
        Ok(())
    }

    /// Returns the content under `reference` as a `T`.
    pub fn content<T: Content>(&self, reference: &str) -> Result<&T, GameError> {
        let reference = self.checks.ensure_ref("content ref is not empty", reference)?;
        let shelf = self.shelf(reference)?;
        shelf
            .content
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| type_error::<T>(reference))
    }

    pub fn content_mut<T: Content>(&mut self, reference: &str) -> Result<&mut T, GameError> {
        let reference = self.checks.ensure_ref("content ref is not empty", reference)?;
        let shelf = self.shelf_mut(reference)?;
        shelf
            .content
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| type_error::<T>(reference))
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.shelves.contains_key(reference.trim())
    }

    pub fn len(&self) -> usize {
        self.shelves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    //--- Single Content ---------------------------------------------------

    /// Excludes the content from batch operations, or includes it again.
    pub fn set_independent(&mut self, reference: &str, independent: bool) -> Result<(), GameError> {
        self.shelf_mut(reference.trim())?.independent = independent;
        Ok(())
    }

    pub fn is_independent(&self, reference: &str) -> Result<bool, GameError> {
        Ok(self.shelf(reference.trim())?.independent)
    }

    pub fn is_initialized(&self, reference: &str) -> Result<bool, GameError> {
        Ok(self.shelf(reference.trim())?.initialized)
    }

    pub fn is_loaded(&self, reference: &str) -> Result<bool, GameError> {
        Ok(self.shelf(reference.trim())?.loaded)
    }

    pub fn initialize_content(&mut self, reference: &str) -> Result<(), GameError> {
        self.shelf_mut(reference.trim())?.initialize();
        Ok(())
    }

    pub fn load_content(&mut self, reference: &str) -> Result<(), GameError> {
        self.shelf_mut(reference.trim())?.load();
        Ok(())
    }

    pub fn unload_content(&mut self, reference: &str) -> Result<(), GameError> {
        self.shelf_mut(reference.trim())?.unload();
        Ok(())
    }

    //--- Batch Operations -------------------------------------------------

    /// Initializes every dependent content not yet initialized.
    pub fn create(&mut self) {
        self.each_dependent(Shelf::initialize);
    }

    /// Loads every dependent content not yet loaded.
    pub fn load(&mut self) {
        self.each_dependent(Shelf::load);
    }

    /// Unloads every loaded dependent content.
    pub fn unload(&mut self) {
        self.each_dependent(Shelf::unload);
    }

    /// Disposes every dependent content. Contents stay stored.
    pub fn destroy(&mut self) {
        self.each_dependent(|shelf| shelf.content.dispose());
    }

    fn each_dependent(&mut self, mut f: impl FnMut(&mut Shelf)) {
        for reference in &self.order {
            if let Some(shelf) = self.shelves.get_mut(reference) {
                if !shelf.independent {
                    f(shelf);
                }
            }
        }
    }

    //--- Lookup -----------------------------------------------------------

    fn shelf(&self, reference: &str) -> Result<&Shelf, GameError> {
        self.checks
            .require("content ref exists", self.shelves.get(reference))
    }

    fn shelf_mut(&mut self, reference: &str) -> Result<&mut Shelf, GameError> {
        self.checks
            .require("content ref exists", self.shelves.get_mut(reference))
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new(DebugChecks::default())
    }
}

fn type_error<T>(reference: &str) -> GameError {
    GameError::AssetType {
        reference: reference.to_string(),
        expected: std::any::type_name::<T>(),
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Font {
        initialized: u32,
        loads: u32,
        unloads: u32,
        disposed: bool,
    }

    impl Content for Font {
        fn initialize(&mut self) {
            self.initialized += 1;
        }

        fn load(&mut self) {
            self.loads += 1;
        }

        fn unload(&mut self) {
            self.unloads += 1;
        }

        fn dispose(&mut self) {
            self.disposed = true;
        }
    }

    #[derive(Default)]
    struct Slot;
    impl Content for Slot {}

    fn library() -> Library {
        let mut library = Library::default();
        library.set_content("font", Font::default()).unwrap();
        library.set_content("bank", Font::default()).unwrap();
        library
    }

    #[test]
    fn refs_must_be_unique_and_non_empty() {
        let mut library = library();

        let err = library.set_content(" font ", Slot).unwrap_err();
        assert_eq!(err.tag(), Some("content ref is unique"));

        let err = library.set_content("  ", Slot).unwrap_err();
        assert_eq!(err.tag(), Some("content ref is not empty"));

        assert_eq!(library.len(), 2);
    }

    #[test]
    fn typed_access() {
        let mut library = library();

        library.content_mut::<Font>("font").unwrap().loads = 7;
        assert_eq!(library.content::<Font>("font").unwrap().loads, 7);

        assert!(matches!(
            library.content::<Slot>("font"),
            Err(GameError::AssetType { .. })
        ));
        assert_eq!(
            library.content::<Font>("missing").err().and_then(|e| e.tag().map(String::from)),
            Some("content ref exists".to_string())
        );
    }

    #[test]
    fn batch_operations_skip_independent_contents() {
        let mut library = library();
        library.set_independent("bank", true).unwrap();

        library.create();
        library.load();
        library.load();

        let font = library.content::<Font>("font").unwrap();
        assert_eq!((font.initialized, font.loads), (1, 1));
        assert!(library.is_loaded("font").unwrap());

        let bank = library.content::<Font>("bank").unwrap();
        assert_eq!((bank.initialized, bank.loads), (0, 0));
        assert!(!library.is_initialized("bank").unwrap());

        library.unload();
        library.destroy();

        let font = library.content::<Font>("font").unwrap();
        assert_eq!(font.unloads, 1);
        assert!(font.disposed);
        assert!(!library.content::<Font>("bank").unwrap().disposed);
    }

    #[test]
    fn independent_contents_are_driven_by_hand() {
        let mut library = library();
        library.set_independent("bank", true).unwrap();

        library.initialize_content("bank").unwrap();
        library.load_content("bank").unwrap();
        library.unload_content("bank").unwrap();
        library.unload_content("bank").unwrap();

        let bank = library.content::<Font>("bank").unwrap();
        assert_eq!((bank.initialized, bank.loads, bank.unloads), (1, 1, 1));
        assert!(library.is_independent("bank").unwrap());
    }
}
