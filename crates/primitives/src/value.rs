use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Compares two payload values using the store's cross-type ordering.
///
/// Types rank `null < booleans < numbers < strings < arrays/objects`.
/// Within a type: `false < true`, numbers numerically, strings by byte
/// order. Arrays and objects compare equal to each other; callers break such
/// ties by key.
pub fn compare_values(lhs: &Value, rhs: &Value) -> Ordering {
	match (lhs, rhs) {
		(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
		(Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
		(Value::String(a), Value::String(b)) => a.cmp(b),
		_ => rank(lhs).cmp(&rank(rhs)),
	}
}

const fn rank(value: &Value) -> u8 {
	match value {
		Value::Null => 0,
		Value::Bool(_) => 1,
		Value::Number(_) => 2,
		Value::String(_) => 3,
		Value::Array(_) | Value::Object(_) => 4,
	}
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
	match (a.as_i64(), b.as_i64()) {
		(Some(a), Some(b)) => a.cmp(&b),
		_ => a
			.as_f64()
			.unwrap_or_default()
			.total_cmp(&b.as_f64().unwrap_or_default()),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	#[rstest]
	#[case(json!(null), json!(false))]
	#[case(json!(false), json!(true))]
	#[case(json!(true), json!(-5))]
	#[case(json!(2), json!(10))]
	#[case(json!(1.5), json!(2))]
	#[case(json!(99), json!("1"))]
	#[case(json!("a"), json!("b"))]
	#[case(json!("zzz"), json!({ "a": 1 }))]
	fn orders_before(#[case] lhs: Value, #[case] rhs: Value) {
		assert_eq!(compare_values(&lhs, &rhs), Ordering::Less);
		assert_eq!(compare_values(&rhs, &lhs), Ordering::Greater);
	}

	#[test]
	fn composite_values_tie() {
		assert_eq!(compare_values(&json!([1]), &json!({ "a": 1 })), Ordering::Equal);
	}
}
