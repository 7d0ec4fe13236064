//=========================================================================
// Debug Checks
//=========================================================================
//
// Switchable precondition checker.
//
// Guard checks (`ensure`, `ensure_eq`) only fire while checks are
// enabled; with checks off the caller proceeds as if the condition held.
// Structural checks (`require`) always fire, because the caller has
// nothing to operate on without the looked-up value.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::Debug;

use log::debug;

//=== Internal Dependencies ===============================================

use crate::error::GameError;

//=== DebugChecks =========================================================

/// Precondition checker shared by the game controller and the storage
/// helpers. Enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugChecks {
    enabled: bool,
}

impl DebugChecks {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    //--- Guard Checks -----------------------------------------------------

    /// Fails with `tag` when `condition` is false and checks are enabled.
    pub fn ensure(&self, tag: &str, condition: bool) -> Result<(), GameError> {
        if self.enabled && !condition {
            return Err(GameError::check(tag));
        }
        Ok(())
    }

    /// Fails with `tag` when `value != expect` and checks are enabled.
    pub fn ensure_eq<T: PartialEq + Debug>(
        &self,
        tag: &str,
        value: T,
        expect: T,
    ) -> Result<(), GameError> {
        if self.enabled && value != expect {
            debug!(target: "stagehand::checks", "{}: got {:?}, expected {:?}", tag, value, expect);
            return Err(GameError::check(tag));
        }
        Ok(())
    }

    /// Trims `reference` and fails with `tag` if nothing is left.
    ///
    /// Whitespace-only refs are never valid, so the trimmed form is the
    /// one callers store and look up.
    pub fn ensure_ref<'a>(&self, tag: &str, reference: &'a str) -> Result<&'a str, GameError> {
        let trimmed = reference.trim();
        self.ensure(tag, !trimmed.is_empty())?;
        Ok(trimmed)
    }

    //--- Structural Checks ------------------------------------------------

    /// Unwraps a lookup result, failing with `tag` regardless of whether
    /// checks are enabled.
    pub fn require<T>(&self, tag: &str, value: Option<T>) -> Result<T, GameError> {
        value.ok_or_else(|| GameError::check(tag))
    }

    //--- Diagnostics ------------------------------------------------------

    /// Emits a diagnostic message while checks are enabled.
    pub fn report(&self, tag: &str, message: &str) {
        if self.enabled {
            debug!(target: "stagehand::checks", "{}: {}", tag, message);
        }
    }
}

impl Default for DebugChecks {
    fn default() -> Self {
        Self::new(true)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_by_default() {
        assert!(DebugChecks::default().is_enabled());
    }

    #[test]
    fn ensure_fails_with_tag_when_enabled() {
        let checks = DebugChecks::new(true);
        let err = checks.ensure("asset ref is unique", false).unwrap_err();
        assert_eq!(err.tag(), Some("asset ref is unique"));
        assert!(checks.ensure("asset ref is unique", true).is_ok());
    }

    #[test]
    fn ensure_passes_when_disabled() {
        let checks = DebugChecks::new(false);
        assert!(checks.ensure("anything", false).is_ok());
        assert!(checks.ensure_eq("phase", 1, 2).is_ok());
    }

    #[test]
    fn ensure_eq_compares_values() {
        let checks = DebugChecks::new(true);
        assert!(checks.ensure_eq("same", "a", "a").is_ok());
        assert!(checks.ensure_eq("different", "a", "b").is_err());
    }

    #[test]
    fn ensure_ref_trims_and_rejects_blank() {
        let checks = DebugChecks::new(true);
        assert_eq!(checks.ensure_ref("ref", "  menu ").unwrap(), "menu");
        assert!(checks.ensure_ref("ref is not empty", "   ").is_err());
    }

    #[test]
    fn require_fails_even_when_disabled() {
        let checks = DebugChecks::new(false);
        let missing: Option<u32> = None;
        let err = checks.require("screen ref exists", missing).unwrap_err();
        assert_eq!(err.tag(), Some("screen ref exists"));
        assert_eq!(checks.require("present", Some(3)).unwrap(), 3);
    }
}
