use berth_protocol::*;
use pretty_assertions::assert_eq;

const REPORT_FIXTURE: &str = r#"{
  "endpoint": "/var/run/docker.sock",
  "default_version": "1.17",
  "known_versions": ["1.17", "1.18", "1.19", "1.20"],
  "available_versions": ["1.17", "1.19", "1.20"],
  "checked_at": "2024-01-01T00:00:00Z"
}"#;

fn sample_version_set() -> VersionSet {
    VersionSet::new(
        [VERSION_1_17, VERSION_1_18, VERSION_1_19, VERSION_1_20],
        VERSION_1_17,
    )
    .unwrap()
}

#[test]
fn report_fixture_deserializes() {
    let report = DiscoveryReport::from_json(REPORT_FIXTURE).unwrap();

    assert_eq!(report.endpoint, "/var/run/docker.sock");
    assert_eq!(report.default_version, VERSION_1_17);
    assert_eq!(
        report.available_versions,
        vec![VERSION_1_17, VERSION_1_19, VERSION_1_20]
    );
    assert_eq!(report.checked_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    assert!(report.default_available());
    assert_eq!(report.newest_available(), Some(VERSION_1_20));
}

#[test]
fn versions_serialize_as_strings() {
    let report = DiscoveryReport::new(
        "/run/engine.sock",
        &sample_version_set(),
        vec![VERSION_1_18, VERSION_1_20],
    );
    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(value["default_version"], serde_json::json!("1.17"));
    assert_eq!(
        value["known_versions"],
        serde_json::json!(["1.17", "1.18", "1.19", "1.20"])
    );
    assert_eq!(value["available_versions"], serde_json::json!(["1.18", "1.20"]));
}

#[test]
fn report_without_default_available() {
    let report = DiscoveryReport::new("/run/engine.sock", &sample_version_set(), vec![]);

    assert!(!report.default_available());
    assert_eq!(report.newest_available(), None);
}

#[test]
fn malformed_version_in_report_is_rejected() {
    let doc = REPORT_FIXTURE.replace(
        r#""available_versions": ["1.17", "1.19", "1.20"]"#,
        r#""available_versions": ["1.17", "one.twenty"]"#,
    );
    let err = DiscoveryReport::from_json(&doc).unwrap_err();
    assert!(err.to_string().contains("one.twenty"));
}

#[test]
fn known_set_matches_constants() {
    let set = VersionSet::known();
    assert_eq!(set.versions(), KNOWN_VERSIONS);
    assert_eq!(set.default_version(), DEFAULT_VERSION);
}
