pub mod matches;
pub mod period;

pub use matches::*;
pub use period::*;
