use super::*;
use std::str::FromStr;

#[test]
fn test_repository_name_from_bare_name_succeeds() {
    let name = RepositoryName::from_str("registry.example.com/team/app").unwrap();
    assert_eq!(name.registry(), "registry.example.com");
    assert_eq!(name.path(), "team/app");
    assert_eq!(name.as_str(), "registry.example.com/team/app");
}

#[test]
fn test_repository_name_with_port_succeeds() {
    let name = RepositoryName::from_str("localhost:5000/falcon-sensor").unwrap();
    assert_eq!(name.registry(), "localhost:5000");
    assert_eq!(name.path(), "falcon-sensor");
}

#[test]
fn test_repository_name_with_tag_fails() {
    let result = RepositoryName::from_str("registry.example.com/img:v1");
    assert!(matches!(result.unwrap_err(), SyncError::Validation { .. }));
}

#[test]
fn test_repository_name_with_digest_fails() {
    let result = RepositoryName::from_str(
        "registry.example.com/img@sha256:c5b1261d6d3e43071626931fc004f70149baeba2c8ec672bd4f27761f8e1ad6b",
    );
    assert!(result.is_err());
}

#[test]
fn test_repository_name_single_component_with_tag_fails() {
    assert!(RepositoryName::from_str("alpine:3.19").is_err());
}

#[test]
fn test_repository_name_empty_fails() {
    assert!(RepositoryName::from_str("   ").is_err());
}

#[test]
fn test_repository_name_with_uppercase_fails() {
    let result = RepositoryName::from_str("registry.example.com/Invalid-Reference-With-Caps");
    assert!(matches!(result.unwrap_err(), SyncError::Validation { .. }));
}

#[test]
fn test_repository_name_display_round_trips_input() {
    let raw = "registry.crowdstrike.com/falcon-kac/us-1/release/falcon-kac";
    let name = RepositoryName::from_str(raw).unwrap();
    assert_eq!(name.to_string(), raw);
}
