pub mod conditions;
pub mod node_claim;
pub mod node_pool;
