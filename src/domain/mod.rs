// Domain layer - Core business logic

pub mod commands;
pub mod errors;
pub mod model;
pub mod rules;
pub mod store;
