mod article;
mod block;
mod sync;

pub use article::{Article, ArticleStatus};
pub use block::{Annotations, Block, BlockKind, RichText};
pub use sync::{ReconcileStats, SyncMetadata, SyncReport, SyncStatus, SyncType};
