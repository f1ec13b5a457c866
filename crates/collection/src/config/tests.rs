use std::cmp::Ordering;

use rstest::rstest;

use super::*;
use crate::error::CollectionError;
use crate::test_support::*;

const CONFIG: &str = r#"
	page_size = 25

	[[sort]]
	field = "tag"

	[[sort]]
	field = "num"
	direction = "descending"
"#;

fn decoded(entry: livelist_primitives::Entry) -> Item {
	Item::decode(&entry).unwrap()
}

#[test]
fn parses_rules_and_page_size() {
	let config = CollectionConfig::from_toml_str(CONFIG).unwrap();
	assert_eq!(config.page_size, 25);
	assert_eq!(
		config.sort,
		[
			SortRuleConfig {
				field: "tag".into(),
				direction: SortDirection::Ascending,
			},
			SortRuleConfig {
				field: "num".into(),
				direction: SortDirection::Descending,
			},
		]
	);
}

#[test]
fn empty_document_uses_defaults() {
	let config = CollectionConfig::from_toml_str("").unwrap();
	assert_eq!(config, CollectionConfig::default());
	assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
	assert!(matches!(config.sort_order::<Item>(), SortOrder::Key));
}

#[rstest]
#[case("page_size = 0", "invalid page size")]
#[case("[[sort]]\nfield = \"  \"", "empty field path")]
#[case("page_size = \"ten\"", "TOML parse error")]
#[case("limit = 3", "TOML parse error")]
#[case("[[sort]]\nfield = \"num\"\ndirection = \"sideways\"", "TOML parse error")]
fn rejects_invalid_documents(#[case] input: &str, #[case] message: &str) {
	let error = CollectionConfig::from_toml_str(input).unwrap_err();
	assert!(error.to_string().contains(message), "unexpected error: {error}");
}

#[test]
fn configured_rules_order_records() {
	let order = CollectionConfig::from_toml_str(CONFIG).unwrap().sort_order::<Item>();
	let plain = decoded(item("a", 1));
	let high = decoded(tagged("b", 9, "x"));
	let low = decoded(tagged("c", 2, "x"));
	let other = decoded(tagged("d", 50, "y"));

	assert_eq!(order.compare(&plain, &high), Ordering::Less);
	assert_eq!(order.compare(&high, &low), Ordering::Less);
	assert_eq!(order.compare(&low, &other), Ordering::Less);
}

#[test]
fn builds_paginated_collection() {
	let config = CollectionConfig::from_toml_str(CONFIG).unwrap();
	let pages = config.paginated::<Item>().unwrap();
	assert_eq!(pages.page_size(), 25);

	let invalid = CollectionConfig {
		page_size: 0,
		..CollectionConfig::default()
	};
	assert!(matches!(invalid.paginated::<Item>(), Err(CollectionError::ZeroPageSize)));
}
