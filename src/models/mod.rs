pub mod credits;
pub mod generation;
pub mod payment;

pub use credits::*;
pub use generation::*;
pub use payment::*;
