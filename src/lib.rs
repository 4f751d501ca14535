//! Surgery Engine - phase-based, interruptible surgical procedures

pub mod anatomy;
pub mod check;
pub mod core;
pub mod engine;
pub mod entity;
pub mod items;
pub mod procedures;
pub mod world;
