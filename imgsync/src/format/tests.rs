use super::*;
use libimgsync::report::ReportAssembler;
use libimgsync::{ImageReport, TagRecord};

fn report() -> AggregateReport {
    ReportAssembler::start().finish(vec![ImageReport {
        name: "Falcon Kubernetes Admission Controller".to_string(),
        description: "admission controller".to_string(),
        registry: "registry.crowdstrike.com".to_string(),
        repository: "registry.crowdstrike.com/falcon-kac/us-1/release/falcon-kac".to_string(),
        latest: "7.20.0".to_string(),
        digest: "sha256:abc".to_string(),
        login: "fc-abcdef".to_string(),
        password: "secret".to_string(),
        docker_auth_config: "e30=".to_string(),
        tags: vec![TagRecord {
            name: "7.20.0".to_string(),
            digest: "sha256:abc".to_string(),
            arch: vec!["x86_64".to_string()],
        }],
    }])
}

#[test]
fn test_output_format_from_str() {
    assert_eq!(OutputFormat::from("json"), OutputFormat::Json);
    assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
    assert_eq!(OutputFormat::from("yml"), OutputFormat::Yaml);
    assert_eq!(OutputFormat::from("yaml"), OutputFormat::Yaml);
    assert_eq!(OutputFormat::from("anything"), OutputFormat::Pretty);
}

#[test]
fn test_format_json_uses_report_keys() {
    let output = format_output(&report(), OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(value["images"][0]["dockerAuthConfig"], "e30=");
    assert_eq!(value["images"][0]["tags"][0]["arch"][0], "x86_64");
    assert!(value["duration"].is_i64());
}

#[test]
fn test_format_yaml() {
    let output = format_output(&report(), OutputFormat::Yaml).unwrap();
    assert!(output.contains("latest: 7.20.0"));
    assert!(output.contains("dockerAuthConfig"));
}

#[test]
fn test_format_pretty_summarizes_without_password() {
    let output = format_output(&report(), OutputFormat::Pretty).unwrap();

    assert!(output.contains("Falcon Kubernetes Admission Controller"));
    assert!(output.contains("Latest:     7.20.0 (sha256:abc)"));
    assert!(output.contains("1 images, 1 tags"));
    assert!(!output.contains("secret"));
}
