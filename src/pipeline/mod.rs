pub mod buffers;
pub mod job_runner;
pub mod orchestrator;
pub mod pass;
