pub mod compositor;
pub mod surface;

pub use compositor::Compositor;
pub use surface::{Placement, PresentInfo, PresentationHost};
