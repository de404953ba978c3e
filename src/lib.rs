//! Workout routine tracker that keeps a local SQLite cache in step with a
//! remote per-user document tree.

pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod remote;
pub mod session;
pub mod sync;
