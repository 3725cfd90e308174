pub mod heuristic;
pub mod orchestrator;
pub mod provider;
