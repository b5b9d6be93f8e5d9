use kube::core::CustomResourceExt;
use oprc_liveness::crd::{node_claim::NodeClaim, node_pool::NodePool};

fn main() -> anyhow::Result<()> {
    for crd in [NodeClaim::crd(), NodePool::crd()] {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
