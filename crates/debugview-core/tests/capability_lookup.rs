use std::sync::Arc;

use debugview_core::{
    Adaptable, AsyncTreeViewer, CapabilityLookup, ChildrenUpdate, LabelUpdate, MemoryTree,
    PollingScheduler, PresentationAdapter, PresentationContext, TreeWidget, ViewerOptions,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Node {
    Session,
    Thread(u32),
    /// Shown in the tree but has no presentation of its own.
    Opaque,
}

struct SessionPresentation;

impl PresentationAdapter<Node> for SessionPresentation {
    fn retrieve_label(&self, element: &Node, context: &PresentationContext, mut update: LabelUpdate<Node>) {
        if let Node::Thread(id) = element {
            update.set_text(format!("{} thread {id}", context.id()));
        }
        update.done();
    }

    fn retrieve_children(
        &self,
        element: &Node,
        _context: &PresentationContext,
        mut update: ChildrenUpdate<Node>,
    ) {
        if *element == Node::Session {
            update.add_child(Node::Thread(1), false);
            update.add_child(Node::Opaque, false);
            update.add_child(Node::Thread(2), false);
        }
        update.done();
    }
}

impl Adaptable for Node {
    fn presentation_adapter(&self) -> Option<Arc<dyn PresentationAdapter<Self>>> {
        match self {
            Node::Opaque => None,
            _ => Some(Arc::new(SessionPresentation)),
        }
    }
}

#[test]
fn elements_supply_their_own_adapter() {
    let mut viewer: AsyncTreeViewer<Node, MemoryTree> = AsyncTreeViewer::with_options(
        MemoryTree::new(),
        Arc::new(CapabilityLookup),
        Arc::new(PollingScheduler),
        ViewerOptions::default().with_context_id("debug"),
    );
    viewer.set_input(Node::Session);
    while viewer.dispatch_pending() > 0 {}

    assert_eq!(viewer.widget().outline(), "  debug thread 1\n  …\n  debug thread 2\n");
    let children = viewer.widget().children(0).expect("root alive");
    assert_eq!(viewer.registry().element_of(children[1]), Some(&Node::Opaque));
    assert!(!viewer.has_pending_updates());
}
