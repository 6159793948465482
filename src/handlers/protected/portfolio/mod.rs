pub mod create;
pub mod update;

// Re-export handler functions for use in routing
pub use create::create as portfolio_create;
pub use update::update as portfolio_update;
