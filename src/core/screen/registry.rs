//=========================================================================
// Screen Registry
//=========================================================================
//
// Ordered map from ref to registered screen (or transition).
//
// Entries are created once during initialization and never removed.
// While the controller dispatches a callback to a screen, that screen's
// box is lent out of its entry (`screen == None`) so the callback can
// reach the rest of the game state through its context.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::TypeId;
use std::collections::HashMap;

//=== Internal Dependencies ===============================================

use super::{LifecycleFlags, ScreenSlot};

//=== Entry ===============================================================

/// One registered screen with its asset refs and lifecycle flags.
///
/// `state` carries per-kind extra state (`HandOff` for transitions).
pub(crate) struct Entry<T: ?Sized, S = ()> {
    pub(crate) screen: Option<Box<T>>,
    pub(crate) type_id: TypeId,
    pub(crate) asset_refs: Vec<String>,
    pub(crate) flags: LifecycleFlags,
    pub(crate) state: S,
}

impl<T: ?Sized, S: Default> Entry<T, S> {
    pub(crate) fn new(screen: Box<T>, type_id: TypeId) -> Self {
        Self {
            screen: Some(screen),
            type_id,
            asset_refs: Vec::new(),
            flags: LifecycleFlags::default(),
            state: S::default(),
        }
    }
}

//=== HandOff =============================================================

/// Transient state of one transition run.
///
/// Set by `launch`, cleared once the incoming screen is delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HandOff {
    /// Screen that was active when the transition was launched.
    pub(crate) outgoing: Option<ScreenSlot>,

    /// Screen the transition delivers.
    pub(crate) incoming: Option<String>,

    /// Screen currently visible beneath the transition.
    pub(crate) showing: Option<ScreenSlot>,

    /// The outgoing screen has been hidden and unloaded.
    pub(crate) transferred: bool,

    /// `switch_screens` was requested; completes after the transition's
    /// current callback returns.
    pub(crate) delivering: bool,
}

//=== Registry ============================================================

pub(crate) struct Registry<T: ?Sized, S = ()> {
    entries: HashMap<String, Entry<T, S>>,
    order: Vec<String>,
}

impl<T: ?Sized, S> Registry<T, S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub(crate) fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    /// Whether a screen of the same concrete type is already registered.
    pub(crate) fn contains_type(&self, type_id: TypeId) -> bool {
        self.entries.values().any(|e| e.type_id == type_id)
    }

    /// Inserts or replaces the entry under `reference`.
    pub(crate) fn insert(&mut self, reference: String, entry: Entry<T, S>) {
        if self.entries.insert(reference.clone(), entry).is_none() {
            self.order.push(reference);
        }
    }

    pub(crate) fn get(&self, reference: &str) -> Option<&Entry<T, S>> {
        self.entries.get(reference)
    }

    pub(crate) fn get_mut(&mut self, reference: &str) -> Option<&mut Entry<T, S>> {
        self.entries.get_mut(reference)
    }

    /// First registered ref.
    pub(crate) fn first(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    /// Refs in registration order.
    pub(crate) fn refs(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
