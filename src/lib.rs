pub mod access;
pub mod auth;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod database;
pub mod document;
pub mod domain;
pub mod embedding;
pub mod entities;
pub mod handlers;
pub mod ingestion;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod retrieval;
pub mod state;
pub mod utils;
