pub mod dialects;
pub mod logger;
pub mod model;
