#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Area resolution, review ingestion, and aggregate recomputation.
//!
//! The write path for the safety map engine: free-text area names resolve
//! through a matching ladder (creating neutral areas when nothing matches),
//! reviews are validated and persisted, and each area's derived statistics
//! are recomputed from its full review history under per-area write
//! serialization.

pub mod aggregator;
pub mod ingestor;
mod locks;
pub mod resolver;

pub use aggregator::ReviewAggregator;
pub use ingestor::ReviewIngestor;
pub use resolver::{AreaRef, AreaResolver, normalize_name};
