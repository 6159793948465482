pub mod get;
pub mod list;

// Re-export handler functions for use in routing
pub use get::get as portfolio_get;
pub use list::list as portfolio_list;
