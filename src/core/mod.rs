pub mod acl;
pub mod catalog;
pub mod config;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod runner;
pub mod schema;
pub mod settings;
pub mod store;
pub mod terminal;
