//! The scan pipeline: files in, dependency graph and per-file reports out.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::DependencyGraph;
use crate::identity::AssemblyId;
use crate::metadata::{AssemblySource, LoadError};
use crate::vendor::VendorFilter;
use crate::walker::ReferenceWalker;

/// How a single input file fared during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Vendor-valid assembly whose references were recorded.
    Analyzed { id: AssemblyId },
    /// Not a managed assembly; skipped silently.
    NotManaged,
    /// A managed assembly outside the vendor family; skipped silently.
    NotVendor { id: AssemblyId },
    /// Managed-looking file that failed to load; worth one diagnostic line.
    LoadFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Everything a scan produces: the accumulated dependency graph plus one
/// report per input file, in input order.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub graph: DependencyGraph,
    pub reports: Vec<FileReport>,
}

/// Load each file through `source`, keep the vendor-valid assemblies, and
/// record their references into one shared graph.
///
/// Nothing here is fatal: every failure mode is folded into the per-file
/// report and the scan always runs to completion.
pub fn scan_files(source: &dyn AssemblySource, filter: &VendorFilter, files: &[PathBuf]) -> ScanOutcome {
    let walker = ReferenceWalker::new(filter);
    let mut graph = DependencyGraph::new();
    let mut reports = Vec::with_capacity(files.len());

    for path in files {
        let status = scan_one(source, filter, &walker, path, &mut graph);
        reports.push(FileReport { path: path.clone(), status });
    }

    info!(
        files = reports.len(),
        analyzed = reports.iter().filter(|r| matches!(r.status, FileStatus::Analyzed { .. })).count(),
        edges = graph.edge_count(),
        "scan complete"
    );
    ScanOutcome { graph, reports }
}

fn scan_one(
    source: &dyn AssemblySource,
    filter: &VendorFilter,
    walker: &ReferenceWalker<'_>,
    path: &Path,
    graph: &mut DependencyGraph,
) -> FileStatus {
    let assembly = match source.load(path) {
        Ok(assembly) => assembly,
        Err(LoadError::NotApplicable) => {
            debug!(path = %path.display(), "not a managed assembly");
            return FileStatus::NotManaged;
        }
        Err(LoadError::Failed(message)) => return FileStatus::LoadFailed { message },
    };

    if !filter.is_valid(assembly.company()) {
        debug!(path = %path.display(), id = %assembly.id(), "outside vendor family");
        return FileStatus::NotVendor { id: assembly.id().clone() };
    }

    walker.record_references(assembly.as_ref(), graph);
    FileStatus::Analyzed { id: assembly.id().clone() }
}
