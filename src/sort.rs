//! Merge sort, the primitive behind the collision probe.

/// Merges two sorted slices into a single sorted vector
/// containing all elements of both.
///
/// Takes the lesser head of `lhs` and `rhs` repeatedly, `lhs` winning ties,
/// so a sort built on this merge is stable.
pub fn merge<T: Ord + Copy>(lhs: &[T], rhs: &[T]) -> Vec<T> {
    let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
    let mut lhs_head = 0;
    let mut rhs_head = 0;
    while lhs_head < lhs.len() && rhs_head < rhs.len() {
        if lhs[lhs_head] <= rhs[rhs_head] {
            merged.push(lhs[lhs_head]);
            lhs_head += 1;
        } else {
            merged.push(rhs[rhs_head]);
            rhs_head += 1;
        }
    }
    merged.extend_from_slice(&lhs[lhs_head..]);
    merged.extend_from_slice(&rhs[rhs_head..]);
    merged
}

/// Returns the elements of `values` in ascending order,
/// sorting by recursive midpoint split and [`merge`] of the sorted halves.
pub fn merge_sort<T: Ord + Copy>(values: &[T]) -> Vec<T> {
    if values.len() <= 1 {
        return values.to_vec();
    }
    let (lhs, rhs) = values.split_at(values.len() / 2);
    merge(&merge_sort(lhs), &merge_sort(rhs))
}
