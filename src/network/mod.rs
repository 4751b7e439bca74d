pub mod gateway;
pub mod interfaces;
pub mod probe;
