pub mod paths;
pub mod temp_manager;
