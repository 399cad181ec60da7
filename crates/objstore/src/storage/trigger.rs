//! Persistence hooks.

use crate::core::value::ObjectKey;
use crate::object::StoredObject;

/// Callbacks invoked around writes. Every hook defaults to a no-op.
///
/// Before-hooks run before the transaction opens; after-hooks run only once
/// the write has committed.
pub trait Trigger: Send + Sync {
    fn on_before_persist(&self, _object: &StoredObject) {}

    fn on_after_persist(&self, _object: &StoredObject) {}

    /// Called for each requested id of a delete that removed at least one
    /// row.
    fn on_delete(&self, _type_name: &str, _id: &ObjectKey) {}
}
