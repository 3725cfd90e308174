pub mod q_store;
