// src/cfg/mod.rs

pub mod config;
pub mod secure;
