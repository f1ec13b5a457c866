use proptest::prelude::*;

use super::*;

fn less(a: &i32, b: &i32) -> bool {
	a < b
}

#[test]
fn empty_slice_inserts_at_zero() {
	assert_eq!(search(&[], &4, less), Err(0));
}

#[test]
fn finds_existing_element() {
	let sorted = [1, 3, 5, 7, 9];
	assert_eq!(search(&sorted, &7, less), Ok(3));
	assert_eq!(search(&sorted, &1, less), Ok(0));
}

#[test]
fn insertion_points_cover_both_ends() {
	let sorted = [10, 20, 30];
	assert_eq!(insertion_index(&sorted, &5, less), 0);
	assert_eq!(insertion_index(&sorted, &25, less), 2);
	assert_eq!(insertion_index(&sorted, &35, less), 3);
}

#[test]
fn equivalent_element_stops_search() {
	// Compare by tens digit only: 21 and 24 are equivalent.
	let sorted = [10, 21, 30];
	let by_tens = |a: &i32, b: &i32| a / 10 < b / 10;
	assert_eq!(search(&sorted, &24, by_tens), Ok(1));
}

proptest! {
	/// Inserting at the returned index always leaves the slice sorted.
	#[test]
	fn prop_insertion_keeps_order(mut values in proptest::collection::vec(-1000i32..1000, 0..64), x in -1000i32..1000) {
		values.sort_unstable();
		let index = insertion_index(&values, &x, less);
		values.insert(index, x);
		prop_assert!(values.windows(2).all(|w| w[0] <= w[1]));
	}

	/// `search` agrees with the standard library on membership.
	#[test]
	fn prop_search_matches_membership(mut values in proptest::collection::vec(-50i32..50, 0..32), x in -50i32..50) {
		values.sort_unstable();
		values.dedup();
		prop_assert_eq!(search(&values, &x, less).is_ok(), values.binary_search(&x).is_ok());
	}
}
