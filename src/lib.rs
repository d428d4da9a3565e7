pub mod config;
pub mod error;
pub mod labels;
pub mod session;
pub mod source;
pub mod store;
