pub mod medication;
pub mod suggestion;
pub mod warning;

pub use medication::*;
pub use suggestion::*;
pub use warning::*;
