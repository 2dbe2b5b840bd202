pub mod classify;
pub mod config;
pub mod countdown;
pub mod error;
pub mod fetcher;
pub mod html;
pub mod models;
pub mod parser;
pub mod screen;
pub mod store;
pub mod tags;
pub mod viewer;
