use std::path::PathBuf;
use std::sync::Arc;

use debugview_actions::{
    qualified_name, SourceContainer, SourceContainerWorkbenchAdapter, WorkbenchAdapter,
};
use debugview_core::{
    AsyncTreeViewer, ChildrenUpdate, LabelUpdate, MemoryTree, PollingScheduler,
    PresentationAdapter, PresentationContext, SharedAdapter,
};

#[test]
fn folder_label_uses_workspace_path() {
    let adapter = SourceContainerWorkbenchAdapter;
    let folder = SourceContainer::Folder {
        full_path: PathBuf::from("/project/src/main"),
    };
    let expected = qualified_name(&PathBuf::from("/project/src/main"));

    assert_eq!(adapter.label(&folder), expected);
    assert!(adapter.children(&folder).is_empty());
    assert!(adapter.image_descriptor(&folder).is_none());
    assert!(adapter.parent(&folder).is_none());
}

#[test]
fn directory_label_resolves_relative_paths() {
    let adapter = SourceContainerWorkbenchAdapter;
    let directory = SourceContainer::Directory {
        path: PathBuf::from("lib"),
        search_subfolders: true,
    };
    let absolute = std::env::current_dir().expect("cwd").join("lib");

    assert_eq!(adapter.label(&directory), qualified_name(&absolute));
    assert!(adapter.label(&directory).starts_with("lib - "));
}

#[test]
fn other_containers_have_empty_label() {
    let adapter = SourceContainerWorkbenchAdapter;
    let archive = SourceContainer::Other {
        kind: "archive".to_owned(),
        name: "rt.jar".to_owned(),
    };
    assert_eq!(adapter.label(&archive), "");
}

/// Groups containers under a fixed root so they can be shown in a viewer.
struct LookupPath {
    containers: Vec<SourceContainer>,
}

impl PresentationAdapter<SourceContainer> for LookupPath {
    fn retrieve_label(
        &self,
        element: &SourceContainer,
        context: &PresentationContext,
        update: LabelUpdate<SourceContainer>,
    ) {
        SourceContainerWorkbenchAdapter.retrieve_label(element, context, update);
    }

    fn retrieve_children(
        &self,
        element: &SourceContainer,
        context: &PresentationContext,
        mut update: ChildrenUpdate<SourceContainer>,
    ) {
        if matches!(element, SourceContainer::Other { kind, .. } if kind == "lookup-path") {
            for container in &self.containers {
                update.add_child(container.clone(), false);
            }
            update.done();
            return;
        }
        SourceContainerWorkbenchAdapter.retrieve_children(element, context, update);
    }
}

#[test]
fn containers_render_in_viewer() {
    let containers = vec![
        SourceContainer::Folder {
            full_path: PathBuf::from("/app/src"),
        },
        SourceContainer::Other {
            kind: "archive".to_owned(),
            name: "deps.zip".to_owned(),
        },
    ];
    let adapter: Arc<dyn PresentationAdapter<SourceContainer>> = Arc::new(LookupPath {
        containers: containers.clone(),
    });
    let mut viewer: AsyncTreeViewer<SourceContainer, MemoryTree> = AsyncTreeViewer::new(
        MemoryTree::new(),
        Arc::new(SharedAdapter::new(adapter)),
        Arc::new(PollingScheduler),
    );

    viewer.set_input(SourceContainer::Other {
        kind: "lookup-path".to_owned(),
        name: "default".to_owned(),
    });
    while viewer.dispatch_pending() > 0 {}

    let expected = format!("  {}\n  \n", qualified_name(&PathBuf::from("/app/src")));
    assert_eq!(viewer.widget().outline(), expected);
    assert_eq!(viewer.registry().nodes_for(&containers[1]).len(), 1);
}
