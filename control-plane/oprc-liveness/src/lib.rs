pub mod config;
pub mod controller;
pub mod crd;
pub mod runtime;
pub mod web;

use tracing_subscriber::{
    EnvFilter,
    filter::{Directive, LevelFilter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init_tracing(default_env: &str) {
    let mut filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .from_env_lossy();
    match default_env.parse::<Directive>() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(_) => {
            filter = filter.add_directive(LevelFilter::INFO.into());
        }
    }

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}
