mod spec;
mod status;
mod k8;

pub use spec::*;
pub use status::*;
