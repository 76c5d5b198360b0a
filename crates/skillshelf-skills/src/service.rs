//! Shared skills service
//!
//! Holds the current registry snapshot behind a pointer swap. Readers clone
//! the `Arc` and never observe a half-built registry; rebuilds index on a
//! blocking thread and install the result in one short write.

use skillshelf_types::SkillEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::error::{Result, SkillError};
use crate::fs::{OsFs, SkillFs};
use crate::indexer::SkillIndexer;
use crate::loader::ContentLoader;
use crate::query::{QueryEngine, SkillRequest, SkillResponse};
use crate::registry::{IndexDiagnostic, SkillRegistry};
use crate::resolver::{resolve_roots, SkillSources};

/// Capacity of the event channel
pub const EVENT_CAPACITY: usize = 64;

/// Sending half of the skill event channel
pub type EventSender = broadcast::Sender<SkillEvent>;

/// New event channel with [`EVENT_CAPACITY`]
///
/// Hand the sender to [`SkillsService::with_events`] to observe the
/// discovery event of the very first build.
pub fn event_channel() -> (EventSender, broadcast::Receiver<SkillEvent>) {
    broadcast::channel(EVENT_CAPACITY)
}

/// Installed snapshot and the sources it was built from
struct Installed {
    registry: Arc<SkillRegistry>,
    sources: SkillSources,
}

/// Skill registry shared by every request in the process
pub struct SkillsService {
    fs: Arc<dyn SkillFs>,
    current: RwLock<Installed>,
    generation: AtomicU64,
    engine: QueryEngine,
    events: EventSender,
}

impl SkillsService {
    /// Create the service and build the first snapshot
    pub async fn new(fs: Arc<dyn SkillFs>, sources: SkillSources) -> Result<Self> {
        let (events, _) = event_channel();
        Self::with_events(fs, sources, events).await
    }

    /// Create the service publishing to an existing channel
    ///
    /// Subscribers of `events` receive the discovery event of the first build.
    pub async fn with_events(
        fs: Arc<dyn SkillFs>,
        sources: SkillSources,
        events: EventSender,
    ) -> Result<Self> {
        let service = Self {
            engine: QueryEngine::new(ContentLoader::new(Arc::clone(&fs))),
            fs,
            current: RwLock::new(Installed {
                registry: Arc::new(SkillRegistry::empty()),
                sources: sources.clone(),
            }),
            generation: AtomicU64::new(0),
            events,
        };

        service.rebuild(sources).await?;
        Ok(service)
    }

    /// Create the service over the real filesystem
    pub async fn from_os(sources: SkillSources) -> Result<Self> {
        Self::new(Arc::new(OsFs), sources).await
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<SkillRegistry> {
        Arc::clone(&self.current.read().await.registry)
    }

    /// Sources the current snapshot was built from
    pub async fn sources(&self) -> SkillSources {
        self.current.read().await.sources.clone()
    }

    /// Subscribe to discovery and load events
    pub fn subscribe(&self) -> broadcast::Receiver<SkillEvent> {
        self.events.subscribe()
    }

    /// Re-scan every root from scratch
    pub async fn refresh(&self) -> Result<Arc<SkillRegistry>> {
        let sources = self.sources().await;
        self.rebuild(sources).await
    }

    /// Replace the directory configuration
    ///
    /// Rebuilds only when the resolved root list differs from the one the
    /// current snapshot was built from. Returns whether a rebuild ran. The
    /// new sources only stick if their snapshot is the one installed.
    pub async fn set_sources(&self, sources: SkillSources) -> Result<bool> {
        let roots = resolve_roots(&sources, self.fs.as_ref());

        {
            let mut current = self.current.write().await;
            if current.registry.roots() == roots.as_slice() {
                debug!("Skills directories unchanged, keeping current snapshot");
                current.sources = sources;
                return Ok(false);
            }
        }

        self.rebuild(sources).await?;
        Ok(true)
    }

    /// Answer one request against the current snapshot
    pub async fn execute(&self, request: &SkillRequest) -> Result<SkillResponse> {
        let snapshot = self.snapshot().await;
        self.execute_on(snapshot, request).await
    }

    /// Answer one request against a snapshot the caller already holds
    pub async fn execute_on(
        &self,
        snapshot: Arc<SkillRegistry>,
        request: &SkillRequest,
    ) -> Result<SkillResponse> {
        let response = match request {
            SkillRequest::Load { name } => {
                let engine = self.engine.clone();
                let request = request.clone();
                tokio::task::spawn_blocking(move || engine.execute(&snapshot, &request))
                    .await
                    .map_err(|e| SkillError::LoadTask {
                        name: name.clone(),
                        reason: e.to_string(),
                    })??
            }
            _ => self.engine.execute(&snapshot, request)?,
        };

        if let SkillResponse::Load(loaded) = &response {
            self.emit(SkillEvent::loaded(
                loaded.name.clone(),
                loaded.source.clone(),
                loaded.content.len(),
                loaded.version.clone(),
            ));
        }

        Ok(response)
    }

    async fn rebuild(&self, sources: SkillSources) -> Result<Arc<SkillRegistry>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fs = Arc::clone(&self.fs);
        let scan = sources.clone();

        let registry = tokio::task::spawn_blocking(move || {
            let roots = resolve_roots(&scan, fs.as_ref());
            SkillIndexer::new(fs).build(roots, ticket)
        })
        .await
        .map_err(|e| SkillError::Rebuild(e.to_string()))?;

        for diagnostic in registry.diagnostics() {
            match diagnostic {
                IndexDiagnostic::Shadowed { name, kept, shadowed } => {
                    info!("Skill '{}' at {:?} shadowed by {:?}", name, shadowed, kept)
                }
                other => debug!("Index diagnostic: {:?}", other),
            }
        }

        let registry = Arc::new(registry);
        if self.install(Arc::clone(&registry), sources).await {
            self.emit(SkillEvent::discovered(
                registry.names().cloned().collect(),
                registry.sources(),
            ));
        }

        Ok(registry)
    }

    /// Swap in `registry` and its sources unless a newer build is installed
    async fn install(&self, registry: Arc<SkillRegistry>, sources: SkillSources) -> bool {
        let mut current = self.current.write().await;
        if registry.generation() <= current.registry.generation() {
            debug!(
                "Discarding stale skills snapshot {} (current {})",
                registry.generation(),
                current.registry.generation()
            );
            return false;
        }

        info!(
            "Installed skills snapshot {} with {} skills from {} directories",
            registry.generation(),
            registry.len(),
            registry.roots().len()
        );
        *current = Installed { registry, sources };
        true
    }

    fn emit(&self, event: SkillEvent) {
        if self.events.send(event).is_err() {
            debug!("No subscribers for skill events");
        }
    }
}

impl std::fmt::Debug for SkillsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillsService")
            .field("fs", &self.fs)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FsEntry, MemoryFs};
    use crate::resolver::DefaultLocations;
    use std::collections::BTreeMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;

    fn skill_md(name: &str) -> String {
        format!("---\nname: {name}\ndescription: {name} skill\n---\n# {name}\n")
    }

    fn sources(dir: &str) -> SkillSources {
        SkillSources::new()
            .add_explicit(dir)
            .with_defaults(DefaultLocations::default())
    }

    fn names(registry: &SkillRegistry) -> Vec<String> {
        registry.names().cloned().collect()
    }

    /// MemoryFs whose file reads panic once armed
    #[derive(Debug, Default)]
    struct PanickingFs {
        inner: MemoryFs,
        armed: AtomicBool,
    }

    impl SkillFs for PanickingFs {
        fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
            self.inner.read_dir(path)
        }

        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            if self.armed.load(Ordering::SeqCst) {
                panic!("read of {} blew up", path.display());
            }
            self.inner.read_to_string(path)
        }

        fn is_file(&self, path: &Path) -> bool {
            self.inner.is_file(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path)
        }

        fn canonicalize(&self, path: &Path) -> PathBuf {
            self.inner.canonicalize(path)
        }
    }

    #[tokio::test]
    async fn test_install_discards_stale_snapshot() {
        let service = SkillsService::new(Arc::new(MemoryFs::new()), sources("/none"))
            .await
            .unwrap();
        let newer = Arc::new(SkillRegistry::new(BTreeMap::new(), Vec::new(), Vec::new(), 10));
        let older = Arc::new(SkillRegistry::new(BTreeMap::new(), Vec::new(), Vec::new(), 5));

        assert!(service.install(newer, sources("/newer")).await);
        assert!(!service.install(older, sources("/older")).await);
        assert_eq!(service.snapshot().await.generation(), 10);
        assert_eq!(service.sources().await, sources("/newer"));
    }

    #[tokio::test]
    async fn test_stale_build_does_not_replace_sources() {
        let fs = Arc::new(MemoryFs::new());
        fs.add_file("/a/one/SKILL.md", skill_md("one"))
            .add_file("/b/two/SKILL.md", skill_md("two"));
        let service = SkillsService::new(fs.clone(), sources("/a")).await.unwrap();

        let stale_roots = resolve_roots(&sources("/b"), fs.as_ref());
        let stale = SkillIndexer::new(fs).build(stale_roots, 0);
        assert!(!service.install(Arc::new(stale), sources("/b")).await);

        service.refresh().await.unwrap();
        assert_eq!(names(&*service.snapshot().await), vec!["one"]);
    }

    #[tokio::test]
    async fn test_concurrent_set_sources_keep_sources_and_snapshot_together() {
        let fs = Arc::new(MemoryFs::new());
        fs.add_file("/a/one/SKILL.md", skill_md("one"))
            .add_file("/b/two/SKILL.md", skill_md("two"))
            .add_file("/c/three/SKILL.md", skill_md("three"));
        let service = SkillsService::new(fs.clone(), sources("/a")).await.unwrap();

        let (first, second) = tokio::join!(
            service.set_sources(sources("/b")),
            service.set_sources(sources("/c"))
        );
        first.unwrap();
        second.unwrap();

        let installed = service.snapshot().await;
        let stored = service.sources().await;
        assert_eq!(installed.roots(), resolve_roots(&stored, fs.as_ref()).as_slice());

        service.refresh().await.unwrap();
        assert_eq!(names(&*service.snapshot().await), names(&installed));
    }

    #[tokio::test]
    async fn test_set_sources_rebuilds_only_on_change() {
        let fs = Arc::new(MemoryFs::new());
        fs.add_file("/a/one/SKILL.md", skill_md("one"))
            .add_file("/b/two/SKILL.md", skill_md("two"));
        let service = SkillsService::new(fs, sources("/a")).await.unwrap();
        let first = service.snapshot().await.generation();

        assert!(!service.set_sources(sources("/a")).await.unwrap());
        assert_eq!(service.snapshot().await.generation(), first);

        assert!(service.set_sources(sources("/b")).await.unwrap());
        assert_eq!(names(&*service.snapshot().await), vec!["two"]);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_skills() {
        let fs = Arc::new(MemoryFs::new());
        fs.add_dir("/skills");
        let service = SkillsService::new(fs.clone(), sources("/skills")).await.unwrap();
        assert!(service.snapshot().await.is_empty());

        fs.add_file("/skills/late/SKILL.md", skill_md("late"));
        let old = service.snapshot().await;
        service.refresh().await.unwrap();

        assert!(old.is_empty());
        assert!(service.snapshot().await.contains("late"));
    }

    #[tokio::test]
    async fn test_first_build_event_reaches_early_subscriber() {
        let fs = Arc::new(MemoryFs::new());
        fs.add_file("/skills/alpha/SKILL.md", skill_md("alpha"));
        let (events, mut received) = event_channel();

        let service = SkillsService::with_events(fs, sources("/skills"), events)
            .await
            .unwrap();

        match received.try_recv().unwrap() {
            SkillEvent::SkillsDiscovered {
                skill_names,
                sources,
                ..
            } => {
                assert_eq!(skill_names, vec!["alpha"]);
                assert_eq!(sources, vec![PathBuf::from("/skills")]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(service.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_emits_event() {
        let fs = Arc::new(MemoryFs::new());
        fs.add_file(
            "/skills/test-skill/SKILL.md",
            "---\nname: test-skill\ndescription: Test skill\nversion: 1.0.0\n---\n# Test Content",
        );
        let service = SkillsService::new(fs, sources("/skills")).await.unwrap();
        let mut events = service.subscribe();

        service
            .execute(&SkillRequest::Load {
                name: "test-skill".into(),
            })
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            SkillEvent::SkillLoaded {
                skill_name,
                version,
                content_length,
                source,
                ..
            } => {
                assert_eq!(skill_name, "test-skill");
                assert_eq!(version, "1.0.0");
                assert_eq!(content_length, "# Test Content".len());
                assert_eq!(source, PathBuf::from("/skills"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_load_reports_load_failure() {
        let fs = Arc::new(PanickingFs::default());
        fs.inner.add_file("/skills/pdf/SKILL.md", skill_md("pdf"));
        let service = SkillsService::new(fs.clone(), sources("/skills")).await.unwrap();

        fs.armed.store(true, Ordering::SeqCst);
        let err = service
            .execute(&SkillRequest::Load { name: "pdf".into() })
            .await
            .unwrap_err();

        assert!(matches!(err, SkillError::LoadTask { ref name, .. } if name == "pdf"));
        assert!(!err.to_string().contains("rebuild"));
    }

    #[tokio::test]
    async fn test_refresh_emits_discovery_event() {
        let fs = Arc::new(MemoryFs::new());
        for i in 0..3 {
            fs.add_file(format!("/skills/skill-{i}/SKILL.md"), skill_md(&format!("skill-{i}")));
        }
        let service = SkillsService::new(fs, sources("/skills")).await.unwrap();
        let mut events = service.subscribe();

        service.refresh().await.unwrap();

        match events.recv().await.unwrap() {
            SkillEvent::SkillsDiscovered {
                skill_count,
                skill_names,
                sources,
                ..
            } => {
                assert_eq!(skill_count, 3);
                assert_eq!(skill_names, vec!["skill-0", "skill-1", "skill-2"]);
                assert_eq!(sources, vec![PathBuf::from("/skills")]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
