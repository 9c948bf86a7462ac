pub extern crate actix_web;

pub mod config;
pub mod connection;
pub mod handlers;
pub mod server_state;
pub mod tools;
