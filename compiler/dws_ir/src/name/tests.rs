use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn names_compare_case_insensitively() {
    assert_eq!(Name::new("MyVar"), Name::new("myvar"));
    assert_eq!(Name::new("MYVAR"), Name::new("MyVar"));
    assert_ne!(Name::new("MyVar"), Name::new("MyVar2"));
}

#[test]
fn name_keeps_declared_spelling() {
    let name = Name::new("TPoint");
    assert_eq!(name.as_str(), "TPoint");
    assert_eq!(name.key(), "tpoint");
    assert_eq!(name.to_string(), "TPoint");
}

#[test]
fn name_matches_plain_strings() {
    let name = Name::new("Create");
    assert!(name.matches("create"));
    assert!(name.matches("CREATE"));
    assert!(!name.matches("Destroy"));
}

#[test]
fn fold_case_borrows_lowercase_input() {
    assert!(matches!(fold_case("already"), Cow::Borrowed(_)));
    assert!(matches!(fold_case("Mixed"), Cow::Owned(_)));
}

#[test]
fn ci_map_lookup_ignores_case() {
    let mut map = CiMap::new();
    map.insert("Count", 1);
    assert_eq!(map.get("count"), Some(&1));
    assert_eq!(map.get("COUNT"), Some(&1));
    assert!(map.contains_key("CoUnT"));
    assert_eq!(map.get("other"), None);
}

#[test]
fn ci_map_insert_overwrites_and_keeps_first_spelling() {
    let mut map = CiMap::new();
    assert_eq!(map.insert("Value", 1), None);
    assert_eq!(map.insert("VALUE", 2), Some(1));
    assert_eq!(map.len(), 1);
    let (name, value) = map.get_entry("value").unwrap();
    assert_eq!(name.as_str(), "Value");
    assert_eq!(*value, 2);
}

#[test]
fn ci_map_iterates_in_insertion_order() {
    let map: CiMap<i32> = [("Z", 1), ("a", 2), ("M", 3)].into_iter().collect();
    let keys: Vec<&str> = map.keys().map(Name::as_str).collect();
    assert_eq!(keys, vec!["Z", "a", "M"]);
}

#[test]
fn ci_map_equality_ignores_order() {
    let a: CiMap<i32> = [("x", 1), ("y", 2)].into_iter().collect();
    let b: CiMap<i32> = [("Y", 2), ("X", 1)].into_iter().collect();
    assert_eq!(a, b);
}

proptest! {
    #[test]
    fn any_casing_finds_the_entry(key in "[a-zA-Z_][a-zA-Z0-9_]{0,12}") {
        let mut map = CiMap::new();
        map.insert(key.as_str(), 7);
        prop_assert_eq!(map.get(&key.to_uppercase()), Some(&7));
        prop_assert_eq!(map.get(&key.to_lowercase()), Some(&7));
    }
}
