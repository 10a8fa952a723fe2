//! Row types and DTOs.

pub mod job;
pub mod lyrics;
pub mod project;
pub mod status;
