use super::*;
use base64::{Engine as _, engine::general_purpose};

#[test]
fn test_registry_credential_accessors() {
    let cred = RegistryCredential::new("fc-0123abcd", "s3cret");
    assert_eq!(cred.username(), "fc-0123abcd");
    assert_eq!(cred.password(), "s3cret");
}

#[test]
fn test_registry_credential_basic_header() {
    let cred = RegistryCredential::new("testuser", "testpass");
    let header = cred.basic_header_value();
    assert!(header.starts_with("Basic "));

    let decoded = general_purpose::STANDARD
        .decode(header.trim_start_matches("Basic "))
        .unwrap();
    assert_eq!(decoded, b"testuser:testpass");
}

#[test]
fn test_registry_credential_debug_redacts_password() {
    let cred = RegistryCredential::new("fc-0123abcd", "s3cret");
    let debug = format!("{:?}", cred);
    assert!(debug.contains("fc-0123abcd"));
    assert!(!debug.contains("s3cret"));
}

#[test]
fn test_docker_auth_config_document_shape() {
    let cred = RegistryCredential::new("user", "pass");
    let blob = cred.docker_auth_config("registry.crowdstrike.com");

    let decoded = general_purpose::STANDARD.decode(blob).unwrap();
    let document: serde_json::Value = serde_json::from_slice(&decoded).unwrap();

    let auth = document["auths"]["registry.crowdstrike.com"]["auth"]
        .as_str()
        .unwrap();
    let pair = general_purpose::STANDARD.decode(auth).unwrap();
    assert_eq!(pair, b"user:pass");
}

#[test]
fn test_docker_auth_config_is_exact_json() {
    let cred = RegistryCredential::new("user", "pass");
    let blob = cred.docker_auth_config("registry.example.com");
    let decoded = String::from_utf8(general_purpose::STANDARD.decode(blob).unwrap()).unwrap();

    assert_eq!(
        decoded,
        r#"{"auths":{"registry.example.com":{"auth":"dXNlcjpwYXNz"}}}"#
    );
}

#[test]
fn test_docker_auth_config_is_deterministic() {
    let cred = RegistryCredential::new("user", "pass");
    assert_eq!(
        cred.docker_auth_config("registry.example.com"),
        cred.docker_auth_config("registry.example.com")
    );
}

#[test]
fn test_auth_challenge_parse_bearer() {
    let header = r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:alpine:pull""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.scheme, "Bearer");
    assert_eq!(challenge.realm, "https://auth.example.com/token");
    assert_eq!(challenge.service, Some("registry.example.com".to_string()));
    assert_eq!(challenge.scope, Some("repository:alpine:pull".to_string()));
    assert!(challenge.is_bearer());
}

#[test]
fn test_auth_challenge_parse_scope_with_comma() {
    let header = r#"Bearer realm="https://auth.example.com/token",scope="repository:app:pull,push",service="registry""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.scope, Some("repository:app:pull,push".to_string()));
    assert_eq!(challenge.service, Some("registry".to_string()));
}

#[test]
fn test_auth_challenge_parse_without_scope() {
    let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.service, Some("registry".to_string()));
    assert_eq!(challenge.scope, None);
}

#[test]
fn test_auth_challenge_parse_basic() {
    let header = r#"Basic realm="Registry Access""#;

    let challenge = AuthChallenge::parse(header).unwrap();
    assert_eq!(challenge.scheme, "Basic");
    assert_eq!(challenge.realm, "Registry Access");
    assert!(!challenge.is_bearer());
}

#[test]
fn test_auth_challenge_parse_missing_realm() {
    let header = r#"Bearer service="registry""#;
    assert!(AuthChallenge::parse(header).is_err());
}

#[test]
fn test_auth_challenge_parse_invalid_format() {
    assert!(AuthChallenge::parse("InvalidHeader").is_err());
}
