pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod routing;
pub mod services;
pub mod storage;

#[cfg(test)]
pub mod testing;
