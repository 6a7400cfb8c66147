// src/handlers/mod.rs

pub mod answers;
pub mod applications;
pub mod exams;
pub mod students;
pub mod upload;
