//! The native tree widget contract and an in-memory implementation.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::collections::map::HashMap;
use crate::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("node {node} missing")]
    Missing { node: NodeId },
    #[error("node {node} already disposed")]
    Disposed { node: NodeId },
    #[error("index {index} out of bounds for node {parent} with {len} children")]
    InvalidIndex {
        parent: NodeId,
        index: usize,
        len: usize,
    },
    #[error("the root node cannot be disposed")]
    RootDisposal,
}

/// Identifies an image by what it depicts; equal descriptors share one image.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    key: Arc<str>,
}

impl ImageDescriptor {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A rendered image owned by the widget toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);

/// A stateful native tree control.
///
/// Node ids are never reused for the lifetime of the widget; the viewer
/// relies on this to recognise updates aimed at disposed nodes. Disposing a
/// node disposes its whole subtree.
pub trait TreeWidget {
    fn root(&self) -> NodeId;

    /// Creates a node under `parent`, at `index` or appended when `None`.
    fn create_node(&mut self, parent: NodeId, index: Option<usize>) -> Result<NodeId, WidgetError>;

    fn dispose_node(&mut self, node: NodeId) -> Result<(), WidgetError>;

    fn is_disposed(&self, node: NodeId) -> bool;

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, WidgetError>;

    fn child_count(&self, node: NodeId) -> Result<usize, WidgetError> {
        self.children(node).map(|children| children.len())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn is_expanded(&self, node: NodeId) -> bool;

    fn set_expanded(&mut self, node: NodeId, expanded: bool) -> Result<(), WidgetError>;

    fn set_label(
        &mut self,
        node: NodeId,
        text: Option<&str>,
        image: Option<ImageHandle>,
    ) -> Result<(), WidgetError>;

    fn set_selection(&mut self, nodes: &[NodeId]);

    /// Renders an image, or returns `None` when the descriptor cannot be loaded.
    fn create_image(&mut self, descriptor: &ImageDescriptor) -> Option<ImageHandle>;

    fn dispose_image(&mut self, image: ImageHandle);
}

/// Counters kept by [`MemoryTree`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub created: usize,
    pub disposed: usize,
    pub label_writes: usize,
    pub images_created: usize,
    pub images_disposed: usize,
}

#[derive(Debug, Default)]
struct MemoryNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expanded: bool,
    text: Option<String>,
    image: Option<ImageHandle>,
}

/// Headless [`TreeWidget`] backed by a node vector.
#[derive(Debug)]
pub struct MemoryTree {
    nodes: Vec<Option<MemoryNode>>, // slot 0 is the root control
    images: HashMap<ImageHandle, ImageDescriptor>,
    broken_images: Vec<ImageDescriptor>,
    next_image: u64,
    selection: Vec<NodeId>,
    stats: TreeStats,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(MemoryNode::default())],
            images: HashMap::default(),
            broken_images: Vec::new(),
            next_image: 1,
            selection: Vec::new(),
            stats: TreeStats::default(),
        }
    }

    /// Makes `create_image` fail for `descriptor`.
    pub fn mark_image_broken(&mut self, descriptor: ImageDescriptor) {
        self.broken_images.push(descriptor);
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TreeStats::default();
    }

    /// Live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node).ok().and_then(|n| n.text.as_deref())
    }

    pub fn image(&self, node: NodeId) -> Option<&ImageDescriptor> {
        let handle = self.node(node).ok()?.image?;
        self.images.get(&handle)
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// Renders the tree as indented text, one node per line. Nodes without a
    /// label render as `…`, expanded nodes are prefixed with `-`, collapsed
    /// nodes with children with `+`.
    pub fn outline(&self) -> String {
        let mut output = String::new();
        if let Ok(root) = self.node(0) {
            for &child in &root.children {
                self.outline_node(&mut output, child, 0);
            }
        }
        output
    }

    fn outline_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let Ok(node) = self.node(id) else {
            let _ = writeln!(output, "{}[{id}] (missing)", "  ".repeat(depth));
            return;
        };
        let marker = if node.children.is_empty() {
            ' '
        } else if node.expanded {
            '-'
        } else {
            '+'
        };
        let text = node.text.as_deref().unwrap_or("…");
        let _ = writeln!(output, "{}{marker} {text}", "  ".repeat(depth));
        if node.expanded {
            for &child in &node.children {
                self.outline_node(output, child, depth + 1);
            }
        }
    }

    fn node(&self, id: NodeId) -> Result<&MemoryNode, WidgetError> {
        match self.nodes.get(id) {
            Some(Some(node)) => Ok(node),
            Some(None) => Err(WidgetError::Disposed { node: id }),
            None => Err(WidgetError::Missing { node: id }),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, WidgetError> {
        match self.nodes.get_mut(id) {
            Some(Some(node)) => Ok(node),
            Some(None) => Err(WidgetError::Disposed { node: id }),
            None => Err(WidgetError::Missing { node: id }),
        }
    }

    fn release_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        self.stats.disposed += 1;
        for child in node.children {
            self.release_subtree(child);
        }
    }
}

impl TreeWidget for MemoryTree {
    fn root(&self) -> NodeId {
        0
    }

    fn create_node(&mut self, parent: NodeId, index: Option<usize>) -> Result<NodeId, WidgetError> {
        let id = self.nodes.len();
        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.unwrap_or(siblings.len());
        if index > siblings.len() {
            return Err(WidgetError::InvalidIndex {
                parent,
                index,
                len: siblings.len(),
            });
        }
        siblings.insert(index, id);
        self.nodes.push(Some(MemoryNode {
            parent: Some(parent),
            ..MemoryNode::default()
        }));
        self.stats.created += 1;
        Ok(id)
    }

    fn dispose_node(&mut self, node: NodeId) -> Result<(), WidgetError> {
        if node == 0 {
            return Err(WidgetError::RootDisposal);
        }
        let parent = self.node(node)?.parent;
        if let Some(parent) = parent {
            if let Ok(parent) = self.node_mut(parent) {
                parent.children.retain(|&child| child != node);
            }
        }
        self.release_subtree(node);
        let nodes = &self.nodes;
        self.selection
            .retain(|&selected| matches!(nodes.get(selected), Some(Some(_))));
        Ok(())
    }

    fn is_disposed(&self, node: NodeId) -> bool {
        self.node(node).is_err()
    }

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, WidgetError> {
        Ok(self.node(node)?.children.clone())
    }

    fn child_count(&self, node: NodeId) -> Result<usize, WidgetError> {
        Ok(self.node(node)?.children.len())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok().and_then(|n| n.parent)
    }

    fn is_expanded(&self, node: NodeId) -> bool {
        self.node(node).map(|n| n.expanded).unwrap_or(false)
    }

    fn set_expanded(&mut self, node: NodeId, expanded: bool) -> Result<(), WidgetError> {
        self.node_mut(node)?.expanded = expanded;
        Ok(())
    }

    fn set_label(
        &mut self,
        node: NodeId,
        text: Option<&str>,
        image: Option<ImageHandle>,
    ) -> Result<(), WidgetError> {
        let target = self.node_mut(node)?;
        target.text = text.map(str::to_owned);
        target.image = image;
        self.stats.label_writes += 1;
        Ok(())
    }

    fn set_selection(&mut self, nodes: &[NodeId]) {
        self.selection = nodes
            .iter()
            .copied()
            .filter(|&node| !self.is_disposed(node))
            .collect();
    }

    fn create_image(&mut self, descriptor: &ImageDescriptor) -> Option<ImageHandle> {
        if self.broken_images.contains(descriptor) {
            return None;
        }
        let handle = ImageHandle(self.next_image);
        self.next_image += 1;
        self.images.insert(handle, descriptor.clone());
        self.stats.images_created += 1;
        Some(handle)
    }

    fn dispose_image(&mut self, image: ImageHandle) {
        if self.images.remove(&image).is_some() {
            self.stats.images_disposed += 1;
        } else {
            log::warn!("image {image:?} disposed twice or never created");
        }
    }
}
