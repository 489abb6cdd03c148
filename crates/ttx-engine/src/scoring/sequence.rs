//! Order matching for the sequence bonus

/// Length of the longest common subsequence
#[must_use]
pub fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Whether `claimed` (canonical positions in player order) is consistent
/// with canonical order
///
/// Skipped phases do not matter; only the relative order of what was
/// claimed.
#[must_use]
pub fn follows_canonical_order(claimed: &[usize]) -> bool {
    let mut canonical = claimed.to_vec();
    canonical.sort_unstable();
    lcs_len(claimed, &canonical) == claimed.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcs_basics() {
        assert_eq!(lcs_len(&[1, 2, 3, 4], &[1, 3, 4]), 3);
        assert_eq!(lcs_len(&[2, 1], &[1, 2]), 1);
        assert_eq!(lcs_len::<u8>(&[], &[1]), 0);
        assert_eq!(lcs_len(&["a", "b", "c"], &["b", "a", "c"]), 2);
    }

    #[test]
    fn skipped_phases_keep_order() {
        assert!(follows_canonical_order(&[0, 2, 4]));
        assert!(follows_canonical_order(&[3]));
        assert!(!follows_canonical_order(&[1, 0]));
        assert!(!follows_canonical_order(&[0, 3, 2, 4]));
    }
}
