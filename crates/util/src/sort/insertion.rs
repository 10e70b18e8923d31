use std::cmp::Ordering;

/// Stable insertion sort with a custom comparator.
///
/// Elements that compare equal keep their relative order, which diff lists
/// rely on when several entries share a key. Meant for the short lists the
/// patchers deal with; O(n²) in the worst case, O(n) when already sorted.
///
/// # Examples
///
/// ```
/// use nbmerge_util::sort::insertion_sort_by;
///
/// let mut arr = vec![3, 1, 4, 1, 5];
/// insertion_sort_by(&mut arr, |a, b| b.cmp(a)); // Descending order
/// assert_eq!(arr, vec![5, 4, 3, 1, 1]);
/// ```
pub fn insertion_sort_by<T, F>(arr: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = arr.len();
    for i in 1..len {
        let mut j = i;
        while j > 0 && compare(&arr[j - 1], &arr[j]) == Ordering::Greater {
            arr.swap(j - 1, j);
            j -= 1;
        }
    }
}
