pub mod archive;
pub mod engine;
pub mod file_ops;
pub mod filter;
