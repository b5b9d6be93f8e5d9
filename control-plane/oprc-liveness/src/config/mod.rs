mod types;

pub use types::LivenessConfig;
