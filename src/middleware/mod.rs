pub mod actor;
pub mod cors;

pub use actor::*;
pub use cors::build_cors;
