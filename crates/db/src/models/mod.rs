pub mod generation_job;
pub mod generation_log;
pub mod pantry;
pub mod recipe;
pub mod user;
