mod engine;
mod reconcile;

pub use engine::{SyncEngine, SyncPhase, BLOCK_FETCH_CONCURRENCY};
pub use reconcile::reconcile;
