#[macro_use]
mod util;

pub mod mono;
pub mod reil;
pub mod register_tracking;
