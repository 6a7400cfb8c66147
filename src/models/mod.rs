// src/models/mod.rs

pub mod application;
pub mod exam;
pub mod profile;
pub mod school;
