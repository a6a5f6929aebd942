pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod rooms;
pub mod services;
pub mod state;
pub mod tasks;
