// Handler modules
pub mod guide;
pub mod run;
pub mod status;

// Re-export all handler functions
pub use guide::handle_guide;
pub use run::handle_run;
pub use status::handle_status;
