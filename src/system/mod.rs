pub mod backup;
pub mod ifcfg;
pub mod patcher;
pub mod resolver;
pub mod scrub;
pub mod service;
