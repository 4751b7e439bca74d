pub mod loader;
pub mod saved;
pub mod structs;
