// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain      = { "demo" },
    dashed     = { "my-project" },
    underscore = { "my_project" },
    digits     = { "build42" },
)]
fn accepts_valid_names(raw: &str) {
    let name = SessionName::new(raw).unwrap();
    assert_eq!(name.as_str(), raw);
}

#[yare::parameterized(
    empty    = { "" },
    slash    = { "a/b" },
    dot      = { "a.b" },
    space    = { "a b" },
    unicode  = { "café" },
)]
fn rejects_invalid_names(raw: &str) {
    assert!(SessionName::new(raw).is_err());
}

#[yare::parameterized(
    simple     = { "/tmp/demo", "demo" },
    dotted     = { "/home/me/my.project", "my-project" },
    spaced     = { "/srv/a b  c", "a-b-c" },
    degenerate = { "/tmp/...", "session" },
)]
fn derives_name_from_dir(dir: &str, expected: &str) {
    let name = SessionName::derive_from_dir(Path::new(dir));
    assert_eq!(name.as_str(), expected);
}

#[test]
fn suffix_produces_distinct_valid_names() {
    let name = SessionName::new("demo").unwrap();
    assert_eq!(name.with_suffix(2).as_str(), "demo-2");
    assert_eq!(name.with_suffix(3).as_str(), "demo-3");
}

#[test]
fn serde_round_trip_rejects_bad_input() {
    let name: SessionName = serde_json::from_str("\"demo\"").unwrap();
    assert_eq!(name.as_str(), "demo");
    assert!(serde_json::from_str::<SessionName>("\"a/b\"").is_err());
}

#[test]
fn record_round_trips_through_json() {
    let record = SessionRecord {
        name: SessionName::new("demo").unwrap(),
        pid: 4242,
        port: 7681,
        url_path: "/ttyd-mux/demo".to_string(),
        dir: PathBuf::from("/tmp/demo"),
        started_at: Utc::now(),
    };
    let json = serde_json::to_string(&record).unwrap();
    let back: SessionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}
