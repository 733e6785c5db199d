#![cfg(feature = "serde")]

use vellum::{path, snv, NullableSnv, Path, Snv};

#[test]
fn snv_serializes_as_plain_json() {
    let v = snv!({ "width": 3.5, "children": [1, { "x": (-2) }] });
    let json = serde_json::to_string(&v).unwrap();
    assert_eq!(json, r#"{"children":[1.0,{"x":-2.0}],"width":3.5}"#);

    let back: Snv = serde_json::from_str(&json).unwrap();
    assert_eq!(back, v);
}

#[test]
fn holes_serialize_as_null() {
    let mut c = NullableSnv::nulls_like(&snv!({ "a": [0, 0] }));
    c.set_scalar(&path!["a", 1], Some(4.0));
    let json = serde_json::to_string(&c).unwrap();
    assert_eq!(json, r#"{"a":[null,4.0]}"#);

    let back: NullableSnv = serde_json::from_str(&json).unwrap();
    assert_eq!(back, c);
}

#[test]
fn hand_written_json_reads_back() {
    let v: Snv = serde_json::from_str(r#"{ "h": 2, "items": [[], {}, 7] }"#).unwrap();
    assert_eq!(v.dim(), 2);
    assert_eq!(v.scalar_at(&path!["items", 2]), 7.0);
    assert!(v.is_congruent(&snv!({ "h": 0, "items": [[], {}, 0] })));
}

#[test]
fn paths_serialize_as_key_arrays() {
    let p = path!["children", 2, "width"];
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, r#"["children",2,"width"]"#);

    let back: Path = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}
