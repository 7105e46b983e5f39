//! # Waves Telegram Bot
//!
//! A Telegram bot for community administrators that builds the weekly wave
//! rotation (15 waves of 3 spawns) through a menu-driven wizard and stores
//! the finished list as JSON for downstream presenters.

pub mod bot;
pub mod catalog;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod storage;
