//! Incremental updates to a [`GroupedResult`] after a file is removed.
//!
//! Removing a member never re-hashes or re-groups anything. A group that
//! falls below two members disappears, statistics are recomputed and the
//! display order is restored, so the outcome matches a full re-run without
//! that file. Unknown paths are a no-op.
//!
//! The hash cache is not touched here; whoever deletes the file on disk is
//! responsible for invalidating its cache entry.

use std::path::Path;

use super::groups::GroupedResult;

impl GroupedResult {
    /// Remove `path` from whichever group holds it.
    ///
    /// Returns `true` if the path was a member of some group.
    pub fn remove_path(&mut self, path: &Path) -> bool {
        let Some(index) = self.groups.iter().position(|g| g.contains(path)) else {
            log::trace!("{} is not in any duplicate group", path.display());
            return false;
        };

        let group = &mut self.groups[index];
        group.files.retain(|f| f.path != path);

        if group.len() < 2 {
            log::debug!(
                "Group {} fell below two members, removing it",
                group.digest
            );
            self.groups.remove(index);
        }

        self.refresh();
        true
    }
}

/// Return `result` with `path` removed.
///
/// See [`GroupedResult::remove_path`].
#[must_use]
pub fn remove_file(mut result: GroupedResult, path: &Path) -> GroupedResult {
    result.remove_path(path);
    result
}
