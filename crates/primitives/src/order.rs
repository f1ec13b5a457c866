//! Ordered insertion into sorted slices.
//!
//! `is_before` is a strict "ordered before" predicate. Two elements for which
//! neither is before the other are equivalent; the search stops at the first
//! equivalent slot it probes. Callers that need a deterministic slot among
//! equal elements must make the predicate total (e.g. break ties by key).

/// Locates `element` in `sorted`.
///
/// Returns `Ok(index)` when an equivalent element sits at `index`, otherwise
/// `Err(index)` with the position that keeps `sorted` ordered after insertion.
pub fn search<T>(sorted: &[T], element: &T, mut is_before: impl FnMut(&T, &T) -> bool) -> Result<usize, usize> {
	let mut low = 0;
	// Exclusive upper bound.
	let mut high = sorted.len();
	while low < high {
		let mid = low + (high - low) / 2;
		let probe = &sorted[mid];
		if is_before(probe, element) {
			low = mid + 1;
		} else if is_before(element, probe) {
			high = mid;
		} else {
			return Ok(mid);
		}
	}
	Err(low)
}

/// Index at which `element` already is, or would be inserted into `sorted`.
pub fn insertion_index<T>(sorted: &[T], element: &T, is_before: impl FnMut(&T, &T) -> bool) -> usize {
	match search(sorted, element, is_before) {
		Ok(index) | Err(index) => index,
	}
}

#[cfg(test)]
mod tests;
