pub mod auth;
pub mod config;
pub mod controller;
pub mod feeds;
pub mod slug;
pub mod store;
pub mod tui;
pub mod workflow;
