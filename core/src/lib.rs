pub mod analysis;
pub mod log_file;
pub mod models;
pub mod service;
pub mod smoothing;
