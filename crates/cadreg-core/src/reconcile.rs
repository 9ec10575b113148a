//! Reconciliation of parcel-identifier lists.
//!
//! Given the externally authoritative list and a snapshot of local state,
//! computes the symmetric difference partitioned into additions and
//! removals. Pure — persisting or acting on the result is the caller's
//! job; `to_remove` is the natural input to an archival transition.

use std::collections::BTreeSet;

/// The partitioned symmetric difference of two identifier sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
  /// Present externally, missing locally — records to import.
  pub to_add:    BTreeSet<String>,
  /// Held locally, gone from the authoritative list — records to archive.
  pub to_remove: BTreeSet<String>,
}

impl Reconciliation {
  pub fn is_settled(&self) -> bool {
    self.to_add.is_empty() && self.to_remove.is_empty()
  }
}

/// Partition the difference between `external` (authoritative) and `local`.
pub fn reconcile(
  external: &BTreeSet<String>,
  local: &BTreeSet<String>,
) -> Reconciliation {
  Reconciliation {
    to_add:    external.difference(local).cloned().collect(),
    to_remove: local.difference(external).cloned().collect(),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
