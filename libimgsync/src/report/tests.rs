use super::*;
use serde_json::{Value, json};
use std::time::Duration;

fn image() -> ImageReport {
    ImageReport {
        name: "Falcon Kubernetes Admission Controller".to_string(),
        description: "Admission controller".to_string(),
        registry: "registry.crowdstrike.com".to_string(),
        repository: "registry.crowdstrike.com/falcon-kac/us-1/release/falcon-kac".to_string(),
        latest: "7.20.0".to_string(),
        digest: "sha256:abc".to_string(),
        login: "fc-abcdef".to_string(),
        password: "token".to_string(),
        docker_auth_config: "eyJhdXRocyI6e319".to_string(),
        tags: vec![TagRecord {
            name: "7.20.0".to_string(),
            digest: "sha256:abc".to_string(),
            arch: vec!["aarch64".to_string(), "x86_64".to_string()],
        }],
    }
}

#[test]
fn test_image_report_field_names() {
    let value = serde_json::to_value(image()).unwrap();
    let object = value.as_object().unwrap();

    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "description",
            "digest",
            "dockerAuthConfig",
            "latest",
            "login",
            "name",
            "password",
            "registry",
            "repository",
            "tags",
        ]
    );
    assert_eq!(
        value["tags"][0],
        json!({"name": "7.20.0", "digest": "sha256:abc", "arch": ["aarch64", "x86_64"]})
    );
}

#[test]
fn test_aggregate_report_field_names() {
    let report = ReportAssembler::start().finish(vec![image()]);
    let value: Value = serde_json::to_value(&report).unwrap();

    assert!(value["updated"].is_string());
    assert!(value["duration"].is_i64());
    assert_eq!(value["images"].as_array().unwrap().len(), 1);
}

#[test]
fn test_report_round_trips_through_json() {
    let report = ReportAssembler::start().finish(vec![image(), image()]);
    let text = serde_json::to_string(&report).unwrap();
    let parsed: AggregateReport = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, report);
    assert_eq!(parsed.tag_count(), 2);
}

#[tokio::test]
async fn test_assembler_measures_elapsed_time() {
    let assembler = ReportAssembler::start();
    tokio::time::sleep(Duration::from_millis(15)).await;
    let before = Utc::now();
    let report = assembler.finish(Vec::new());

    assert!(report.duration >= 15);
    assert!(report.updated >= before);
}
