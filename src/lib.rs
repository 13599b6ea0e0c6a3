pub mod common;
pub mod layout;
pub mod model;
pub mod reactor;
pub mod registry;
