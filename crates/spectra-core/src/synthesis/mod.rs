//! Line registration and delegation of optical-depth deposition.

mod engine;
mod orchestrator;
mod partition;

pub use engine::{
    DepositionEngine, DepositionRequest, IonBalance, RegisteredLine, SightlineDataset,
    SightlineLoader,
};
pub use orchestrator::{SynthesisOrchestrator, SynthesisRequest};
pub use partition::{Parallelism, PartitionPlan, default_worker_count, plan_partition};
