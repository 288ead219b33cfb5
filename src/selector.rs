use serde::Serialize;

use crate::config::KeepPolicy;

/// A duplicate group after ordering: `kept` survives, `duplicates` are
/// proposed for deletion, in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalGroup {
    pub kept: usize,
    pub duplicates: Vec<usize>,
}

impl CanonicalGroup {
    /// All members, kept index first.
    pub fn ordered(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.kept).chain(self.duplicates.iter().copied())
    }
}

/// Order `group` by file size and split off the file to keep.
///
/// Smallest first for [`KeepPolicy::Smallest`], largest first for
/// [`KeepPolicy::Largest`]. The sort is stable, so equal sizes keep the
/// traversal order of `group`. Returns `None` for an empty group.
pub fn select_canonical(
    group: &[usize],
    file_size: impl Fn(usize) -> u64,
    keep: KeepPolicy,
) -> Option<CanonicalGroup> {
    let mut ordered = group.to_vec();
    match keep {
        KeepPolicy::Smallest => ordered.sort_by_key(|&i| file_size(i)),
        KeepPolicy::Largest => ordered.sort_by(|&a, &b| file_size(b).cmp(&file_size(a))),
    }

    let (&kept, rest) = ordered.split_first()?;
    Some(CanonicalGroup {
        kept,
        duplicates: rest.to_vec(),
    })
}
