use debugview_core::ImageDescriptor;

/// Presentation contract for elements shown in workbench views: a label,
/// an optional image and a position in a hierarchy.
pub trait WorkbenchAdapter<T> {
    fn children(&self, _element: &T) -> Vec<T> {
        Vec::new()
    }

    fn image_descriptor(&self, _element: &T) -> Option<ImageDescriptor> {
        None
    }

    fn label(&self, element: &T) -> String;

    fn parent(&self, _element: &T) -> Option<T> {
        None
    }
}
