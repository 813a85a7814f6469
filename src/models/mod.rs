pub mod enums;
pub mod medication;
pub mod schedule;

pub use enums::*;
pub use medication::*;
pub use schedule::*;
