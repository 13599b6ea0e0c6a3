pub mod arrange;
pub mod resize;
pub mod tree;

pub use arrange::{
    Axis, Direction, LayoutKind, LayoutOptions, MIN_CONTAINER_DIMENSION, ScrollingOptions, arrange,
};
pub use resize::{LayoutError, Sizing, enforce_resize_constraints, record_resize};
pub use tree::{Container, ContainerTree, NodeId, RestorePoint};
