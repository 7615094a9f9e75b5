pub mod images;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod schema;
pub mod services;
pub mod store;
pub mod validation;
pub mod views;
