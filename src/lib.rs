//! Nutribot Library
//!
//! Food photo identification and nutrition lookup for a Telegram bot.

pub mod bot;
pub mod build_info;
pub mod config;
pub mod db;
pub mod models;
pub mod nutrition;
pub mod services;
