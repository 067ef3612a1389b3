pub mod action;
pub mod collector;
pub mod config;
pub mod errors;
pub mod formatter;
pub mod notifier;
pub mod parser;
pub mod uploader;
