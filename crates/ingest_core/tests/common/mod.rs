#![allow(dead_code)]

use ingest_core::{
    predicate, CandidateObject, CollaboratorError, CommitPackage, CommitSink, ContainerHandle,
    ContainerPlacement, ContentModel, DepositInfo, DescriptiveCrosswalk, ExternalPathIndex,
    FilterContext, ObjectGraph, ObjectId, PipelineConfig, PlacementIndex, PropertyValue,
    ScanVerdict, Submission, TransformError, VirusScanner,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const UNIT: &str = "/unit";

/// Path index over a fixed map of `path -> content models`.
#[derive(Default)]
pub struct MemoryPathIndex {
    nodes: BTreeMap<String, BTreeSet<ContentModel>>,
    pub fail_lookups: bool,
    lookups: AtomicUsize,
}

impl MemoryPathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, path: &str, models: &[ContentModel]) -> Self {
        self.nodes
            .insert(path.to_string(), models.iter().copied().collect());
        self
    }

    pub fn with_container(self, path: &str) -> Self {
        self.with_node(path, &[ContentModel::AdminUnit])
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ExternalPathIndex for MemoryPathIndex {
    fn lookup(&self, path: &str) -> Result<Option<ContainerHandle>, CollaboratorError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(CollaboratorError::new("memory_path_index", "index offline"));
        }
        Ok(self.nodes.get(path).map(|_| ContainerHandle {
            node_id: format!("node:{path}"),
            path: path.to_string(),
        }))
    }

    fn list_content_models(
        &self,
        handle: &ContainerHandle,
    ) -> Result<BTreeSet<ContentModel>, CollaboratorError> {
        Ok(self.nodes.get(&handle.path).cloned().unwrap_or_default())
    }
}

/// Wraps the native record in a `<dc>` element.
pub struct WrappingCrosswalk;

impl DescriptiveCrosswalk for WrappingCrosswalk {
    fn source_format(&self) -> &str {
        "mods"
    }

    fn target_format(&self) -> &str {
        "dc"
    }

    fn transform(&self, native_record: &str) -> Result<String, TransformError> {
        Ok(format!("<dc>{native_record}</dc>"))
    }
}

/// Rejects every record.
pub struct RejectingCrosswalk;

impl DescriptiveCrosswalk for RejectingCrosswalk {
    fn source_format(&self) -> &str {
        "mods"
    }

    fn target_format(&self) -> &str {
        "dc"
    }

    fn transform(&self, _native_record: &str) -> Result<String, TransformError> {
        Err(TransformError::new("unsupported mods dialect"))
    }
}

/// Reports `EICAR` content as infected and `BOOM` content as a scanner failure.
#[derive(Default)]
pub struct ScriptedScanner {
    scans: AtomicUsize,
}

impl ScriptedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl VirusScanner for ScriptedScanner {
    fn agent_name(&self) -> &str {
        "scripted_scanner"
    }

    fn scan(&self, file_bytes: &[u8]) -> ScanVerdict {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let text = String::from_utf8_lossy(file_bytes);
        if text.contains("EICAR") {
            ScanVerdict::Infected {
                report: "Eicar-Test-Signature".to_string(),
            }
        } else if text.contains("BOOM") {
            ScanVerdict::ScanError {
                cause: "daemon unreachable".to_string(),
            }
        } else {
            ScanVerdict::Clean
        }
    }
}

/// Keeps every committed package in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub packages: RefCell<Vec<CommitPackage>>,
}

impl CommitSink for RecordingSink {
    fn commit(&self, package: &CommitPackage) -> Result<(), CollaboratorError> {
        self.packages.borrow_mut().push(package.clone());
        Ok(())
    }
}

/// Refuses every commit.
pub struct FailingSink;

impl CommitSink for FailingSink {
    fn commit(&self, _package: &CommitPackage) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new("failing_sink", "storage unavailable"))
    }
}

/// Collaborators for one test, borrowed by `FilterContext`.
pub struct Harness<C: DescriptiveCrosswalk = WrappingCrosswalk> {
    pub config: PipelineConfig,
    pub index: MemoryPathIndex,
    pub crosswalk: C,
    pub scanner: ScriptedScanner,
}

impl Harness<WrappingCrosswalk> {
    pub fn new(index: MemoryPathIndex) -> Self {
        Self {
            config: PipelineConfig::default(),
            index,
            crosswalk: WrappingCrosswalk,
            scanner: ScriptedScanner::new(),
        }
    }
}

impl<C: DescriptiveCrosswalk> Harness<C> {
    pub fn context(&self) -> FilterContext<'_> {
        FilterContext::new(&self.config, &self.index, &self.crosswalk, &self.scanner)
    }
}

/// Fully valid work with type, owner, slug and label.
pub fn work(slug: &str) -> CandidateObject {
    let mut object = CandidateObject::new();
    object.set_property(
        predicate::HAS_MODEL,
        PropertyValue::literal(ContentModel::Work.as_str()),
    );
    object.set_property(predicate::OWNER, PropertyValue::literal("curator"));
    object.set_property(predicate::SLUG, PropertyValue::literal(slug));
    object.set_property(predicate::LABEL, PropertyValue::literal(format!("Work {slug}")));
    object
}

/// Valid file object pointing at a local payload.
pub fn file_object(slug: &str, location: &std::path::Path) -> CandidateObject {
    let mut object = work(slug);
    object.set_property(
        predicate::HAS_MODEL,
        PropertyValue::literal(ContentModel::File.as_str()),
    );
    object.set_property(
        predicate::FILE_LOCATION,
        PropertyValue::literal(location.to_string_lossy().to_string()),
    );
    object
}

pub fn deposit() -> DepositInfo {
    let mut info = DepositInfo::new("Spring accession", "archivist", "sword", "bagit");
    info.packaging_subtype = Some("v1.0".to_string());
    info
}

/// Submission whose objects are all top-level in `container`, in order.
pub fn submission_in(container: &str, objects: Vec<CandidateObject>) -> (Submission, Vec<ObjectId>) {
    let mut graph = ObjectGraph::new();
    let mut placements = PlacementIndex::new();
    let mut ids = Vec::new();
    for (order, object) in objects.into_iter().enumerate() {
        let id = graph.insert_object(object).unwrap();
        placements.insert(ContainerPlacement::new(id, container, order as u32));
        ids.push(id);
    }
    (Submission::new(graph, placements, deposit()), ids)
}

/// Writes one payload file into `dir`.
pub fn write_payload(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
