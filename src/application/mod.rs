// Application layer - Use cases and store contracts
pub mod error;
pub mod evaluator;
pub mod formula_service;
pub mod navigation_service;
pub mod session;
pub mod tag_store;
