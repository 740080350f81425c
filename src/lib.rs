pub mod app;
pub mod client;
pub mod config;
pub mod gateway;
pub mod models;
pub mod tmdb;
