pub mod q_learning;
pub mod state;
