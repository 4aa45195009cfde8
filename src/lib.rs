pub mod clipboard;
pub mod config;
pub mod db;
pub mod errors;
pub mod fs_utils;
pub mod progress;
pub mod project;
pub mod resource;
pub mod tasks;
