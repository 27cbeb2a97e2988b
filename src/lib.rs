pub mod config;
pub mod handlers;
pub mod quiz;
pub mod screens;
