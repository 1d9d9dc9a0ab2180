pub mod actions;
pub mod auth;
pub mod csv;
pub mod db;
pub mod history;
pub mod import;
pub mod labels;
pub mod qrcode;
pub mod service;
pub mod state;
pub mod types;
pub mod utils;
