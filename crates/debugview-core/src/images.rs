use crate::collections::map::HashMap;
use crate::widget::{ImageDescriptor, ImageHandle, TreeWidget};

/// Rendered images keyed by descriptor. Images live until [`ImageCache::release`].
#[derive(Debug, Default)]
pub struct ImageCache {
    images: HashMap<ImageDescriptor, ImageHandle>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_for<W: TreeWidget + ?Sized>(
        &mut self,
        descriptor: &ImageDescriptor,
        widget: &mut W,
    ) -> Option<ImageHandle> {
        if let Some(&image) = self.images.get(descriptor) {
            return Some(image);
        }
        let image = widget.create_image(descriptor);
        match image {
            Some(image) => {
                self.images.insert(descriptor.clone(), image);
            }
            None => log::debug!("image {} could not be created", descriptor.key()),
        }
        image
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Disposes every cached image. Returns how many were released.
    pub fn release<W: TreeWidget + ?Sized>(&mut self, widget: &mut W) -> usize {
        let released = self.images.len();
        for (_, image) in self.images.drain() {
            widget.dispose_image(image);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::MemoryTree;

    #[test]
    fn equal_descriptors_share_one_image() {
        let mut tree = MemoryTree::new();
        let mut cache = ImageCache::new();
        let first = cache.image_for(&ImageDescriptor::new("thread"), &mut tree);
        let second = cache.image_for(&ImageDescriptor::new("thread"), &mut tree);
        assert_eq!(first, second);
        assert_eq!(tree.stats().images_created, 1);
    }

    #[test]
    fn broken_descriptors_are_not_cached() {
        let mut tree = MemoryTree::new();
        tree.mark_image_broken(ImageDescriptor::new("missing"));
        let mut cache = ImageCache::new();
        assert_eq!(cache.image_for(&ImageDescriptor::new("missing"), &mut tree), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn release_disposes_each_image_once() {
        let mut tree = MemoryTree::new();
        let mut cache = ImageCache::new();
        for key in ["a", "b", "a", "c"] {
            cache.image_for(&ImageDescriptor::new(key), &mut tree);
        }
        assert_eq!(cache.release(&mut tree), 3);
        assert_eq!(cache.release(&mut tree), 0);
        assert_eq!(tree.stats().images_disposed, 3);
        assert_eq!(tree.live_images(), 0);
    }
}
