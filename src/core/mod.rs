pub mod errors;
pub mod services;
pub mod utils;
