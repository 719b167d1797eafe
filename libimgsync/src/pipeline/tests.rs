use super::*;
use crate::auth::RegistryCredential;
use crate::catalog::{Cloud, ProductType, catalog};
use crate::credentials::{CredentialBackend, TokenKind};
use crate::error::SyncError;
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct StaticBackend;

#[async_trait]
impl CredentialBackend for StaticBackend {
    async fn tenant_id(&self) -> Result<String> {
        Ok("ABCDEF-42".to_string())
    }

    async fn registry_token(&self, kind: TokenKind) -> Result<String> {
        Ok(format!("{:?}-token", kind))
    }
}

#[derive(Default)]
struct FakeRegistry {
    tags: HashMap<String, Vec<String>>,
    failing_digest: Option<String>,
    failing_arch: Option<String>,
    credential: Option<RegistryCredential>,
    digest_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

async fn jitter() {
    let delay = rand::thread_rng().gen_range(0..15);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

#[async_trait]
impl ImageRegistry for FakeRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        jitter().await;
        self.tags
            .get(repository)
            .cloned()
            .ok_or_else(|| SyncError::not_found("repository", repository))
    }

    async fn get_digest(&self, repository: &str, tag: &str) -> Result<String> {
        self.digest_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        jitter().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_digest.as_deref() == Some(tag) {
            return Err(SyncError::server("digest lookup failed", 502));
        }
        Ok(format!("sha256:{}:{}", repository.len(), tag))
    }

    async fn get_architectures(&self, _repository: &str, tag: &str) -> Result<BTreeSet<String>> {
        jitter().await;
        if self.failing_arch.as_deref() == Some(tag) {
            return Err(SyncError::validation("unsupported manifest type: v1"));
        }
        Ok(BTreeSet::from(["x86_64".to_string(), "aarch64".to_string()]))
    }

    fn build_auth_blob(&self, registry_host: &str) -> String {
        self.credential
            .as_ref()
            .map(|c| c.docker_auth_config(registry_host))
            .unwrap_or_default()
    }
}

/// Hands out one shared fake per connect call, remembering credentials.
struct FakeConnector {
    registry: Arc<FakeRegistry>,
    connected: Mutex<Vec<RegistryCredential>>,
}

impl RegistryConnector for FakeConnector {
    fn connect(
        &self,
        _registry_host: &str,
        credential: RegistryCredential,
    ) -> Result<Arc<dyn ImageRegistry>> {
        self.connected.lock().unwrap().push(credential);
        Ok(self.registry.clone())
    }
}

fn three_tags_everywhere(entries: &[CatalogEntry]) -> HashMap<String, Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            let tags = match entry.product() {
                ProductType::FalconSensor | ProductType::FalconContainer => {
                    vec!["7.04.0-1", "7.05.0-2", "7.10.0-3"]
                }
                _ => vec!["1.0.0", "1.1.0", "1.2.0"],
            };
            (
                entry.repository().to_string(),
                tags.into_iter().map(String::from).collect(),
            )
        })
        .collect()
}

fn pipeline(registry: FakeRegistry) -> (Pipeline, Arc<FakeConnector>) {
    let connector = Arc::new(FakeConnector {
        registry: Arc::new(registry),
        connected: Mutex::new(Vec::new()),
    });
    let pipeline = Pipeline::new(
        CredentialResolver::new(Arc::new(StaticBackend)),
        connector.clone(),
        TagPolicyEngine::default(),
    );
    (pipeline, connector)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_to_end_preserves_catalog_order() {
    let entries = catalog(Cloud::Us1);
    let (pipeline, _) = pipeline(FakeRegistry {
        tags: three_tags_everywhere(&entries),
        ..Default::default()
    });

    let images = pipeline.run(entries.clone()).await.unwrap();

    assert_eq!(images.len(), 8);
    assert_eq!(images.iter().map(|i| i.tags.len()).sum::<usize>(), 24);
    for (image, entry) in images.iter().zip(&entries) {
        assert_eq!(image.name, entry.name());
        assert_eq!(image.repository, entry.repository());
        assert_eq!(image.registry, "registry.crowdstrike.com");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tags_follow_policy_order_and_latest_is_last() {
    let entries = catalog(Cloud::Us1);
    let mut tags = three_tags_everywhere(&entries);
    tags.insert(
        entries[3].repository().to_string(),
        vec!["1.10.0".into(), "latest".into(), "1.2.0".into(), "1.2.10".into()],
    );
    tags.insert(
        entries[0].repository().to_string(),
        vec!["7.03.0-1".into(), "7.04.0-1".into()],
    );
    let (pipeline, _) = pipeline(FakeRegistry {
        tags,
        ..Default::default()
    });

    let images = pipeline.run(entries).await.unwrap();

    let analyzer: Vec<&str> = images[3].tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(analyzer, vec!["1.2.0", "1.2.10", "1.10.0"]);
    assert_eq!(images[3].latest, "1.10.0");

    let sensor: Vec<&str> = images[0].tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(sensor, vec!["7.04.0-1"]);
    assert_eq!(images[0].latest, "7.04.0-1");
    assert!(images[0].digest.ends_with(":7.04.0-1"));
}

#[tokio::test]
async fn test_credentials_and_auth_blob_per_entry() {
    let entries = catalog(Cloud::Us1);
    let (pipeline, connector) = pipeline(FakeRegistry {
        tags: three_tags_everywhere(&entries),
        ..Default::default()
    });

    let images = pipeline.run(entries).await.unwrap();

    assert_eq!(images[6].login, "fs-abcdef");
    assert_eq!(images[6].password, "Snapshot-token");
    assert_eq!(images[7].login, "fh-abcdef");
    assert_eq!(images[7].password, "FcsCli-token");
    assert_eq!(images[0].login, "fc-abcdef");
    assert_eq!(images[0].password, "Default-token");
    assert_eq!(connector.connected.lock().unwrap().len(), 8);
}

#[tokio::test]
async fn test_latest_digest_is_a_separate_lookup() {
    let entries = vec![CatalogEntry::new(ProductType::FalconKac, Cloud::Us1)];
    let (pipeline, connector) = pipeline(FakeRegistry {
        tags: three_tags_everywhere(&entries),
        ..Default::default()
    });

    pipeline.run(entries).await.unwrap();

    assert_eq!(connector.registry.digest_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_empty_tag_list_leaves_latest_blank() {
    let entry = CatalogEntry::new(ProductType::FalconKac, Cloud::Us1);
    let (pipeline, _) = pipeline(FakeRegistry {
        tags: HashMap::from([(entry.repository().to_string(), Vec::new())]),
        ..Default::default()
    });

    let images = pipeline.run(vec![entry]).await.unwrap();

    assert!(images[0].tags.is_empty());
    assert_eq!(images[0].latest, "");
    assert_eq!(images[0].digest, "");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tag_concurrency_ceiling() {
    let entry = CatalogEntry::new(ProductType::FalconKac, Cloud::Us1);
    let tags: Vec<String> = (0..50).map(|i| format!("1.0.{}", i)).collect();
    let (pipeline, connector) = pipeline(FakeRegistry {
        tags: HashMap::from([(entry.repository().to_string(), tags)]),
        ..Default::default()
    });
    let pipeline = pipeline.with_tag_concurrency(4);

    let images = pipeline.run(vec![entry]).await.unwrap();

    assert_eq!(images[0].tags.len(), 50);
    assert!(connector.registry.peak.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn test_architecture_failure_degrades_to_unknown() {
    let entry = CatalogEntry::new(ProductType::FalconKac, Cloud::Us1);
    let (pipeline, _) = pipeline(FakeRegistry {
        tags: three_tags_everywhere(std::slice::from_ref(&entry)),
        failing_arch: Some("1.1.0".to_string()),
        ..Default::default()
    });

    let images = pipeline.run(vec![entry]).await.unwrap();
    let tags = &images[0].tags;

    assert_eq!(tags[0].arch, vec!["aarch64", "x86_64"]);
    assert_eq!(tags[1].arch, vec!["unknown"]);
    assert_eq!(tags[2].arch, vec!["aarch64", "x86_64"]);
}

#[tokio::test]
async fn test_digest_failure_aborts_whole_run() {
    let entries = catalog(Cloud::Us1);
    let (pipeline, _) = pipeline(FakeRegistry {
        tags: three_tags_everywhere(&entries),
        failing_digest: Some("1.1.0".to_string()),
        ..Default::default()
    });

    let err = pipeline.run(entries).await.unwrap_err();

    match err {
        SyncError::Entry { step, source, .. } => {
            assert_eq!(step, PipelineStep::ResolveTag);
            assert!(matches!(*source, SyncError::Server { .. }));
        }
        other => panic!("expected entry error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_repository_names_entry_and_step() {
    let entries = catalog(Cloud::Us1);
    let mut tags = three_tags_everywhere(&entries);
    tags.remove(entries[2].repository());
    let (pipeline, _) = pipeline(FakeRegistry {
        tags,
        ..Default::default()
    });

    let err = pipeline.run(entries).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Entry {
            ref product,
            step: PipelineStep::ListTags,
            ..
        } if product == "falcon-kac"
    ));
    assert!(err.to_string().starts_with("falcon-kac: failed to list repository tags"));
}

#[tokio::test]
async fn test_tenant_failure_is_fatal_before_any_entry() {
    struct NoTenant;

    #[async_trait]
    impl CredentialBackend for NoTenant {
        async fn tenant_id(&self) -> Result<String> {
            Err(SyncError::authentication("invalid client", Some(401)))
        }

        async fn registry_token(&self, _kind: TokenKind) -> Result<String> {
            Ok("unused".to_string())
        }
    }

    let connector = Arc::new(FakeConnector {
        registry: Arc::new(FakeRegistry::default()),
        connected: Mutex::new(Vec::new()),
    });
    let pipeline = Pipeline::new(
        CredentialResolver::new(Arc::new(NoTenant)),
        connector.clone(),
        TagPolicyEngine::default(),
    );

    let err = pipeline.run(catalog(Cloud::Us1)).await.unwrap_err();

    assert!(matches!(err, SyncError::Resolution { product: None, .. }));
    assert!(connector.connected.lock().unwrap().is_empty());
}
