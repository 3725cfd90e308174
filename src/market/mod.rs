pub mod payout;
pub mod probability;
pub mod simulator;
