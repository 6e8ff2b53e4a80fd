//! Labels for source lookup containers.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use debugview_core::{ChildrenUpdate, LabelUpdate, PresentationAdapter, PresentationContext};

use crate::workbench::WorkbenchAdapter;

/// Where the debugger looks for source files.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceContainer {
    /// A file system directory. Relative paths are resolved against the
    /// current directory when labeled.
    Directory {
        path: PathBuf,
        search_subfolders: bool,
    },
    /// A folder in the workspace, identified by its full workspace path.
    Folder { full_path: PathBuf },
    /// Any other container kind.
    Other { kind: String, name: String },
}

/// Formats `path` as `"<last segment> - <parent>"`.
///
/// A single segment is returned alone; a path with no segments at all, such
/// as `/`, is returned as is.
pub fn qualified_name(path: &Path) -> String {
    let mut device = None;
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => device = Some(prefix.as_os_str().to_string_lossy()),
            Component::Normal(segment) => segments.push(segment.to_string_lossy()),
            Component::RootDir | Component::CurDir | Component::ParentDir => {}
        }
    }
    let Some((last, parents)) = segments.split_last() else {
        return path.to_string_lossy().into_owned();
    };
    let mut name = last.to_string();
    if !parents.is_empty() {
        name.push_str(" - ");
        if let Some(device) = device {
            name.push_str(&device);
        }
        for segment in parents {
            name.push(MAIN_SEPARATOR);
            name.push_str(segment);
        }
    }
    name
}

/// Workbench adapter for the standard source containers. Containers have no
/// children, image or parent.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceContainerWorkbenchAdapter;

impl WorkbenchAdapter<SourceContainer> for SourceContainerWorkbenchAdapter {
    fn label(&self, container: &SourceContainer) -> String {
        match container {
            SourceContainer::Directory { path, .. } => {
                let absolute = std::path::absolute(path).unwrap_or_else(|err| {
                    log::debug!("cannot resolve {}: {err}", path.display());
                    path.clone()
                });
                qualified_name(&absolute)
            }
            SourceContainer::Folder { full_path } => qualified_name(full_path),
            SourceContainer::Other { .. } => String::new(),
        }
    }
}

impl PresentationAdapter<SourceContainer> for SourceContainerWorkbenchAdapter {
    fn retrieve_label(
        &self,
        element: &SourceContainer,
        _context: &PresentationContext,
        mut update: LabelUpdate<SourceContainer>,
    ) {
        update.set_text(WorkbenchAdapter::label(self, element));
        if let Some(image) = self.image_descriptor(element) {
            update.set_image(image);
        }
        update.done();
    }

    fn retrieve_children(
        &self,
        element: &SourceContainer,
        _context: &PresentationContext,
        mut update: ChildrenUpdate<SourceContainer>,
    ) {
        for child in self.children(element) {
            let has_children = !self.children(&child).is_empty();
            update.add_child(child, has_children);
        }
        update.done();
    }
}
