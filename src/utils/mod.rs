pub mod logger;
pub mod privilege;
