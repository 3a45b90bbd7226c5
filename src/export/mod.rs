//! Model export. Currently a single format: binary glTF.

mod glb;

pub use glb::export_glb;
