// handlers/mod.rs - Two-tier handler layout
//
// Public (optional credential) → Protected (credential required)

pub mod protected;
pub mod public;
