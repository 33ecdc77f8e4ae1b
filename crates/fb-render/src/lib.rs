pub mod export;
pub mod hit;
pub mod paint;
pub mod surface;
pub mod svg;
pub mod vello_surface;

pub use export::{Background, ExportError, ExportOptions, export_svg, export_vello};
pub use hit::{Handle, connection_point_at, hit_test, hit_test_rect, resize_handle_at};
pub use paint::{Overlay, ViewTransform, paint_scene};
pub use surface::{RecordingSurface, StrokeStyle, Surface, TextAnchor, TextStyle};
