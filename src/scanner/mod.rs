pub mod partition;
pub mod walk;

pub use partition::{DayPartition, PartitionScanner};
pub use walk::{DayWalker, WalkLimits, WalkStop};
