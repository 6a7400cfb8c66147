// src/grading/mod.rs

//! Scoring of recorded answers and the interactive answer submission.

pub mod calculator;
pub mod submission;

pub use calculator::{Grading, ResultSummary, record_result, summarize};
pub use submission::{SubmissionReport, submit_answers};
