pub mod app;
pub mod audio;
pub mod auth;
pub mod call;
pub mod cli;
pub mod config;
pub mod db;
pub mod global;
pub mod history;
pub mod text_io;
