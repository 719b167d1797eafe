use async_trait::async_trait;
use libimgsync::{
    CatalogEntry, Cloud, Config, CredentialBackend, ImageRegistry, ImageSync, PipelineStep,
    ProductType, RegistryConnector, RegistryCredential, Result, SyncError, TokenKind, catalog,
};
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Backend;

#[async_trait]
impl CredentialBackend for Backend {
    async fn tenant_id(&self) -> Result<String> {
        Ok("0123ABCD-99".to_string())
    }

    async fn registry_token(&self, kind: TokenKind) -> Result<String> {
        Ok(format!("{:?}", kind).to_lowercase())
    }
}

/// Three tags per repository, answered with random latency.
#[derive(Default)]
struct SlowRegistry {
    fail_repository: Option<String>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowRegistry {
    async fn wait(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = rand::thread_rng().gen_range(1..20);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageRegistry for SlowRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        self.wait().await;
        if self.fail_repository.as_deref() == Some(repository) {
            return Err(SyncError::not_found("repository", repository));
        }
        let tags = if repository.contains("/falcon-sensor/")
            || repository.contains("/falcon-container/")
        {
            ["7.10.0-100", "7.04.0-200", "7.05.0-300"]
        } else {
            ["2.0.0", "1.10.0", "1.9.0"]
        };
        Ok(tags.iter().map(|t| t.to_string()).collect())
    }

    async fn get_digest(&self, repository: &str, tag: &str) -> Result<String> {
        self.wait().await;
        Ok(format!("sha256:{}@{}", repository, tag))
    }

    async fn get_architectures(&self, _repository: &str, _tag: &str) -> Result<BTreeSet<String>> {
        self.wait().await;
        Ok(BTreeSet::from(["aarch64".to_string(), "x86_64".to_string()]))
    }

    fn build_auth_blob(&self, registry_host: &str) -> String {
        RegistryCredential::new("user", "pass").docker_auth_config(registry_host)
    }
}

struct SharedConnector(Arc<SlowRegistry>);

impl RegistryConnector for SharedConnector {
    fn connect(
        &self,
        _registry_host: &str,
        _credential: RegistryCredential,
    ) -> Result<Arc<dyn ImageRegistry>> {
        Ok(self.0.clone())
    }
}

fn service(registry: Arc<SlowRegistry>, tag_concurrency: usize) -> ImageSync {
    let mut config = Config::default();
    config.sync.tag_concurrency = tag_concurrency;
    ImageSync::builder()
        .config(config)
        .connector(Arc::new(SharedConnector(registry)))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_full_catalog_report() {
    let registry = Arc::new(SlowRegistry::default());
    let report = service(registry, 10)
        .run_with(Arc::new(Backend), None)
        .await
        .unwrap();

    let names: Vec<&str> = report.images.iter().map(|i| i.name.as_str()).collect();
    let expected: Vec<&str> = catalog(Cloud::Us1).iter().map(|e| e.name()).collect();
    assert_eq!(names, expected);
    assert_eq!(report.tag_count(), 24);
    assert!(report.duration >= 0);

    let sensor: Vec<&str> = report.images[0].tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(sensor, vec!["7.10.0-100", "7.04.0-200", "7.05.0-300"]);

    let analyzer = &report.images[3];
    let tags: Vec<&str> = analyzer.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, vec!["1.9.0", "1.10.0", "2.0.0"]);
    assert_eq!(analyzer.latest, "2.0.0");
    assert!(analyzer.digest.ends_with("@2.0.0"));
    assert_eq!(analyzer.tags[0].arch, vec!["aarch64", "x86_64"]);
    assert_eq!(analyzer.login, "fc-0123abcd");
    assert_eq!(analyzer.password, "default");
    assert!(!analyzer.docker_auth_config.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_report_is_stable_across_runs() {
    let registry = Arc::new(SlowRegistry::default());
    let sync = service(registry, 3);

    let first = sync.run_with(Arc::new(Backend), None).await.unwrap();
    let second = sync.run_with(Arc::new(Backend), None).await.unwrap();

    assert_eq!(first.images, second.images);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_failed_entry_fails_the_whole_report() {
    let failing = CatalogEntry::new(ProductType::FalconSnapshot, Cloud::Us1);
    let registry = Arc::new(SlowRegistry {
        fail_repository: Some(failing.repository().to_string()),
        ..Default::default()
    });

    let err = service(registry, 10)
        .run_with(Arc::new(Backend), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Entry {
            ref product,
            step: PipelineStep::ListTags,
            ..
        } if product == "falcon-snapshot"
    ));
}

#[test]
fn test_report_serializes_with_expected_keys() {
    let config = Config::from_yaml_str("falcon: { cloud: us-gov-2 }").unwrap();
    let entries = catalog(config.falcon.cloud);

    assert_eq!(entries.len(), 8);
    assert_eq!(entries[7].registry(), "registry.us-gov-2.crowdstrike.mil");
    assert_eq!(
        entries[7].repository(),
        "registry.us-gov-2.crowdstrike.mil/fcs/gov2/release/cs-fcs"
    );

    let report = libimgsync::report::ReportAssembler::start().finish(Vec::new());
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("updated").is_some());
    assert!(json.get("duration").is_some());
    assert!(json.get("images").unwrap().as_array().unwrap().is_empty());
}

#[test]
fn test_version_is_exposed() {
    assert_eq!(libimgsync::version(), env!("CARGO_PKG_VERSION"));
}
