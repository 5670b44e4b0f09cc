pub mod admin;
pub mod app;
pub mod app_server;
pub mod catalog;
pub mod config;
pub mod details;
pub mod error;
pub mod http;
pub mod models;
pub mod session;
pub mod suggest;
pub mod tmdb;
pub mod token_store;
