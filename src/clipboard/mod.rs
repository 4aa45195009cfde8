//! Clipboard-driven paste of workspace resources and host files.
//!
//! [`PasteService`] runs a batch: it checks the project's edit permission up
//! front, hands the batch to a [`DropTarget`] when the destination is one, and
//! otherwise pastes item by item through [`merge_resource`] or
//! [`copy_external`]. Per-item failures end up in the [`PasteReport`] and never
//! stop the remaining items.

mod clipboard_size;
mod drop_target;
mod error;
mod ops;
#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};
use tracing::{debug, info, warn};

use crate::{
    errors::{api_error::ApiError, domain::DomainError},
    fs_utils::{is_symlink, sanitize_path_nofollow},
    progress::{ProgressMonitor, ProgressSink, ProgressThrottle},
    project::{Permission, Project},
    resource::{FolderResource, ResourcePath, ResourceStore},
    tasks::CancelState,
};

pub use clipboard_size::estimate_total_size;
pub use drop_target::{DirectoryDropTarget, DropFailure, DropTarget};
pub use error::{ClipboardError, ClipboardErrorCode, ClipboardResult};
pub use ops::{copy_external, merge_resource, resolve_target_name};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasteSource {
    Resource(ResourcePath),
    External(PathBuf),
}

impl PasteSource {
    /// Entry name the source is pasted under.
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Resource(path) if !path.is_root() => Some(path.name().to_string()),
            Self::Resource(_) => None,
            Self::External(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Resource(path) => self.name().unwrap_or_else(|| path.to_string()),
            Self::External(path) => path.display().to_string(),
        }
    }
}

pub enum PasteDestination<'a> {
    Resource(ResourcePath),
    Drop(&'a dyn DropTarget),
}

impl PasteDestination<'_> {
    pub fn display_name(&self) -> String {
        match self {
            Self::Resource(path) => path.to_string(),
            Self::Drop(target) => target.display_name(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClipboardContents {
    Nodes(Vec<ResourcePath>),
    Files(Vec<PathBuf>),
}

impl ClipboardContents {
    pub fn sources(&self) -> Vec<PasteSource> {
        match self {
            Self::Nodes(paths) => paths.iter().cloned().map(PasteSource::Resource).collect(),
            Self::Files(paths) => paths.iter().cloned().map(PasteSource::External).collect(),
        }
    }
}

/// Holds what was last copied.
#[derive(Default)]
pub struct Clipboard {
    state: Mutex<Option<ClipboardContents>>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ClipboardContents>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_nodes(&self, paths: Vec<ResourcePath>) {
        *self.lock() = (!paths.is_empty()).then_some(ClipboardContents::Nodes(paths));
    }

    /// Stores host paths. Every path must exist and must not be a symlink.
    pub fn set_files(&self, paths: Vec<PathBuf>) -> ClipboardResult<()> {
        if paths.is_empty() {
            self.clear();
            return Ok(());
        }
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let clean = sanitize_path_nofollow(&path, true)?;
            if is_symlink(&clean)? {
                return Err(ClipboardError::new(
                    ClipboardErrorCode::SymlinkUnsupported,
                    "Symlinks are not supported in clipboard",
                ));
            }
            entries.push(clean);
        }
        *self.lock() = Some(ClipboardContents::Files(entries));
        Ok(())
    }

    pub fn contents(&self) -> Option<ClipboardContents> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PasteOutcome {
    Pasted { target: String },
    Rejected { reason: ApiError },
    Cancelled,
}

#[derive(Clone, Debug, Serialize)]
pub struct PasteItemReport {
    pub name: String,
    pub outcome: PasteOutcome,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteReport {
    pub project: String,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<PasteItemReport>,
}

impl PasteReport {
    pub fn failed(&self) -> impl Iterator<Item = &PasteItemReport> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, PasteOutcome::Rejected { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn pasted_targets(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                PasteOutcome::Pasted { target } => Some(target.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn was_cancelled(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.outcome == PasteOutcome::Cancelled)
    }

    /// One notification for every failed item, `None` when all went through.
    pub fn summary(&self) -> Option<String> {
        let names: Vec<&str> = self.failed().map(|item| item.name.as_str()).collect();
        if names.is_empty() {
            return None;
        }
        Some(format!(
            "Failed to paste {} item(s) into project '{}':\n{}",
            names.len(),
            self.project,
            names.join(",\n")
        ))
    }
}

fn outcome_of(name: &str, result: ClipboardResult<String>) -> PasteOutcome {
    match result {
        Ok(target) => PasteOutcome::Pasted { target },
        Err(e) if e.is_cancelled() => PasteOutcome::Cancelled,
        Err(e) => {
            warn!(item = name, code = e.code_str(), error = %e, "paste failed");
            PasteOutcome::Rejected {
                reason: e.to_api_error(),
            }
        }
    }
}

fn count_mismatch(
    target: &dyn DropTarget,
    sources: &[PasteSource],
    dropped: &[String],
) -> ClipboardError {
    ClipboardError::new(
        ClipboardErrorCode::TaskFailed,
        format!(
            "Drop target {} reported {} targets for {} sources",
            target.display_name(),
            dropped.len(),
            sources.len()
        ),
    )
}

/// A paste running on its own thread.
pub struct PasteJob {
    id: String,
    handle: JoinHandle<PasteReport>,
}

impl PasteJob {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> ClipboardResult<PasteReport> {
        self.handle.join().map_err(|_| {
            ClipboardError::new(
                ClipboardErrorCode::TaskFailed,
                format!("Paste task '{}' panicked", self.id),
            )
        })
    }
}

pub struct PasteService {
    store: Arc<dyn ResourceStore>,
    project: Project,
    cancel: CancelState,
    throttle: ProgressThrottle,
}

impl PasteService {
    pub fn new(store: Arc<dyn ResourceStore>, project: Project) -> Self {
        Self {
            store,
            project,
            cancel: CancelState::default(),
            throttle: ProgressThrottle::default(),
        }
    }

    pub fn with_throttle(mut self, throttle: ProgressThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn monitor(&self) -> ProgressMonitor {
        ProgressMonitor::new().with_throttle(self.throttle)
    }

    pub fn paste(
        &self,
        sources: &[PasteSource],
        destination: &PasteDestination<'_>,
        monitor: &ProgressMonitor,
    ) -> PasteReport {
        let started_at = Utc::now();
        let destination_name = destination.display_name();
        info!(
            project = self.project.name(),
            destination = %destination_name,
            items = sources.len(),
            "paste started"
        );

        let items = if !self.project.has_permission(Permission::ResourceEdit) {
            self.reject_all(sources)
        } else {
            if monitor.has_sink() {
                monitor.begin(estimate_total_size(self.store(), sources));
            }
            let items = match destination {
                PasteDestination::Drop(target) => self.drop_batch(*target, sources, monitor),
                PasteDestination::Resource(path) => self.paste_each(sources, path, monitor),
            };
            monitor.done();
            items
        };

        let report = PasteReport {
            project: self.project.name().to_string(),
            destination: destination_name,
            started_at,
            finished_at: Utc::now(),
            items,
        };
        match report.summary() {
            Some(summary) => warn!(%summary, "paste finished with failures"),
            None => info!(
                pasted = report.pasted_targets().len(),
                cancelled = report.was_cancelled(),
                "paste finished"
            ),
        }
        report
    }

    pub fn paste_clipboard(
        &self,
        clipboard: &Clipboard,
        destination: &PasteDestination<'_>,
        monitor: &ProgressMonitor,
    ) -> ClipboardResult<PasteReport> {
        let contents = clipboard.contents().ok_or_else(|| {
            ClipboardError::new(ClipboardErrorCode::ClipboardEmpty, "Clipboard is empty")
        })?;
        Ok(self.paste(&contents.sources(), destination, monitor))
    }

    /// Runs a paste into a workspace folder on a worker thread. The job can be
    /// stopped with [`PasteService::cancel`] using the same `id`.
    pub fn spawn_paste(
        self: &Arc<Self>,
        id: impl Into<String>,
        sources: Vec<PasteSource>,
        destination: ResourcePath,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> ClipboardResult<PasteJob> {
        let id = id.into();
        let guard = self.cancel.register(id.clone())?;
        let mut monitor = self.monitor().with_cancel(guard.token());
        if let Some(sink) = sink {
            monitor = monitor.with_sink(sink);
        }
        let service = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("paste-{id}"))
            .spawn(move || {
                let _guard = guard;
                service.paste(&sources, &PasteDestination::Resource(destination), &monitor)
            })
            .map_err(|e| {
                ClipboardError::new(
                    ClipboardErrorCode::TaskFailed,
                    format!("Failed to start paste task: {e}"),
                )
            })?;
        Ok(PasteJob { id, handle })
    }

    pub fn cancel(&self, id: &str) -> ClipboardResult<()> {
        if self.cancel.cancel(id)? {
            debug!(task_id = id, "paste cancel requested");
            Ok(())
        } else {
            Err(ClipboardError::new(
                ClipboardErrorCode::TaskNotFound,
                "Task not found or already finished",
            ))
        }
    }

    fn reject_all(&self, sources: &[PasteSource]) -> Vec<PasteItemReport> {
        let reason = ClipboardError::new(
            ClipboardErrorCode::PermissionDenied,
            format!(
                "Project '{}' lacks {} permission",
                self.project.name(),
                Permission::ResourceEdit.as_str()
            ),
        );
        warn!(project = self.project.name(), "paste refused: {reason}");
        sources
            .iter()
            .map(|source| PasteItemReport {
                name: source.display_name(),
                outcome: PasteOutcome::Rejected {
                    reason: reason.to_api_error(),
                },
            })
            .collect()
    }

    /// A failed batch marks every item failed. A cancelled batch reports the
    /// items dropped before the cancellation as pasted and the rest as
    /// cancelled.
    fn drop_batch(
        &self,
        target: &dyn DropTarget,
        sources: &[PasteSource],
        monitor: &ProgressMonitor,
    ) -> Vec<PasteItemReport> {
        let (dropped, error) = match target.drop_nodes(self.store(), sources, monitor) {
            Ok(dropped) if dropped.len() == sources.len() => (dropped, None),
            Ok(dropped) => (Vec::new(), Some(count_mismatch(target, sources, &dropped))),
            Err(failure) if failure.dropped.len() > sources.len() => {
                (Vec::new(), Some(count_mismatch(target, sources, &failure.dropped)))
            }
            Err(failure) => (failure.dropped, Some(failure.error)),
        };
        let Some(error) = error else {
            return sources
                .iter()
                .zip(dropped)
                .map(|(source, target)| PasteItemReport {
                    name: source.display_name(),
                    outcome: PasteOutcome::Pasted { target },
                })
                .collect();
        };

        if error.is_cancelled() {
            let mut dropped = dropped.into_iter();
            return sources
                .iter()
                .map(|source| PasteItemReport {
                    name: source.display_name(),
                    outcome: match dropped.next() {
                        Some(target) => PasteOutcome::Pasted { target },
                        None => PasteOutcome::Cancelled,
                    },
                })
                .collect();
        }

        let outcome = outcome_of(&target.display_name(), Err(error));
        sources
            .iter()
            .map(|source| PasteItemReport {
                name: source.display_name(),
                outcome: outcome.clone(),
            })
            .collect()
    }

    fn paste_each(
        &self,
        sources: &[PasteSource],
        destination: &ResourcePath,
        monitor: &ProgressMonitor,
    ) -> Vec<PasteItemReport> {
        let container = match self.store.resolve(destination) {
            Ok(Some(resource)) => resource.nearest_container(),
            Ok(None) => FolderResource::new(destination.clone()),
            Err(e) => {
                let reason = ClipboardError::from(e);
                return sources
                    .iter()
                    .map(|source| PasteItemReport {
                        name: source.display_name(),
                        outcome: outcome_of(&source.display_name(), Err(reason.clone())),
                    })
                    .collect();
            }
        };

        let mut items = Vec::with_capacity(sources.len());
        for source in sources {
            let name = source.display_name();
            if monitor.is_cancelled() {
                items.push(PasteItemReport {
                    name,
                    outcome: PasteOutcome::Cancelled,
                });
                continue;
            }
            let result = match source {
                PasteSource::Resource(path) => self.paste_resource(path, &container, monitor),
                PasteSource::External(host) => {
                    match copy_external(self.store(), host, &container, monitor) {
                        Ok(Some(target)) => Ok(target.to_string()),
                        Ok(None) => continue,
                        Err(e) => Err(e),
                    }
                }
            };
            let outcome = outcome_of(&name, result);
            items.push(PasteItemReport { name, outcome });
        }
        items
    }

    fn paste_resource(
        &self,
        path: &ResourcePath,
        container: &FolderResource,
        monitor: &ProgressMonitor,
    ) -> ClipboardResult<String> {
        let source = self.store.resolve(path)?.ok_or_else(|| {
            ClipboardError::new(
                ClipboardErrorCode::NotFound,
                format!("Source does not exist: {path}"),
            )
        })?;
        merge_resource(self.store(), &source, container, monitor).map(|target| target.to_string())
    }
}
