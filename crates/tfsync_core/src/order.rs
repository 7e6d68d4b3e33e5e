//! Application order of the changes inside one changeset.

use crate::types::{Change, ChangeType};

/// Priority of a change: deletes first, then renames, then everything else.
pub fn rank(change_type: &ChangeType) -> u8 {
    if change_type.is_delete() {
        0
    } else if change_type.is_rename() {
        1
    } else {
        2
    }
}

/// Orders changes by [`rank`], keeping source order within a rank.
///
/// A rename onto a path vacated by a delete in the same changeset sees the
/// delete first, and no plain edit runs ahead of a rename.
pub fn order_changes(changes: &[Change]) -> Vec<&Change> {
    let mut ordered: Vec<&Change> = changes.iter().collect();
    ordered.sort_by_key(|change| rank(&change.change_type));
    ordered
}
