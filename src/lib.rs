pub mod agent;
pub mod backend;
pub mod config;
pub mod errors;
pub mod explore;
pub mod models;
pub mod review;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod template;
pub mod ui;

pub use agent::ReflectionAgent;
pub use models::{Entry, EntryUpdate, Exploration, Score};
