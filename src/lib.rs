pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod models;
pub mod nav;
pub mod observability;
pub mod state;
pub mod workflow;
