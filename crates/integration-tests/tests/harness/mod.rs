#![allow(dead_code)]

pub mod config;
pub mod fake_toolkit;
pub mod mock_assets;
pub mod server;
