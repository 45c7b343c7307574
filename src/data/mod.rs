pub mod datetime;
pub mod loader;
pub mod source;
