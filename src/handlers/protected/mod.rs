// handlers/protected/mod.rs - Handlers that require a bearer credential
//
// Every handler here takes an `AuthUser` extractor, which rejects requests
// without a decodable credential with 401.

pub mod portfolio;

pub use portfolio::*;
