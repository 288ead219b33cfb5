//! Collapse a [`DuplicateMatrix`] into disjoint duplicate groups.
//!
//! Groups are stars around a pivot: the first unvisited index in ascending
//! order collects every index its own row marks as a duplicate. Matches are not
//! followed transitively, so with A≈B, B≈C and A≉C the group pivoted at A is
//! {A, B} and C is left for a later pivot. An index already claimed by an
//! earlier group never joins another one, so groups are disjoint.

use crate::similarity::DuplicateMatrix;

/// Returns each group as the ascending list of its member indices, pivot included.
pub fn extract_groups(duplicates: &DuplicateMatrix) -> Vec<Vec<usize>> {
    let n = duplicates.size();
    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let members: Vec<usize> = duplicates
            .row(i)
            .iter()
            .enumerate()
            .filter(|&(j, &dup)| j == i || (dup && !visited[j]))
            .map(|(j, _)| j)
            .collect();

        if members.len() > 1 {
            for &j in &members {
                visited[j] = true;
            }
            groups.push(members);
        }
    }

    groups
}
