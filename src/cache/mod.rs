pub mod artifact;
pub mod parquet;
pub mod session;
pub mod signature;

pub use artifact::{load_raw, persist_clean, persist_clean_best_effort, RawSource};
pub use session::{SessionCache, TableToken};
pub use signature::{compute_signature, same_signature, DirSignature};
