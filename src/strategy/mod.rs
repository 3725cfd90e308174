pub mod kelly;
pub mod staking;
pub mod streak;
pub mod types;
