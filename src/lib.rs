pub mod config;
pub mod docx;
pub mod export;
pub mod form;
pub mod grid;
pub mod loader;
pub mod logo;
pub mod models;
pub mod preview;
pub mod session;
