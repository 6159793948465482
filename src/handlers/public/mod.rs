// handlers/public/mod.rs - Public handlers (no credential required)
//
// Reads are open to everyone. A credential, when present, only identifies
// the viewer for view accounting and owner access to unpublished work.

pub mod portfolio;

pub use portfolio::*;
