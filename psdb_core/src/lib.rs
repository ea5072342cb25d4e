//! # psdb core
//!
//! A pipeline state database: content-addressed records describing samplers,
//! descriptor set layouts, pipeline layouts, shader modules, render passes and
//! pipelines, where records refer to each other by hash from inside their
//! payloads.
//!
//! The main operation is pruning: decode the records, find everything the
//! retained pipelines need, and copy exactly that into a new store.
//!
//! ## Features
//!
//! - Directory-backed record store, partitioned by resource kind
//! - Raw (verbatim) and decoded record access, zstd for large payloads
//! - Callback-driven record decoding ([`StateReplayer`] / [`StateCreator`])
//! - Mark-and-copy pruning, optionally restricted to one capture session
//!
//! ## Example
//!
//! ```no_run
//! use psdb_core::{Hash, PruneOptions, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = Store::open("./pipelines.psdb")?;
//! let output = Store::create("./pruned.psdb")?;
//!
//! let options = PruneOptions {
//!     filter_application: Some("8a3f00c2d19e4b71".parse::<Hash>()?),
//! };
//! let stats = input.prune_into(&output, &options)?;
//!
//! for kind in stats.report() {
//!     println!("{}: {} -> {}", kind.kind, kind.read, kind.written);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod hash;
mod kind;
mod mark;
mod prune;
mod record;
mod replay;
pub mod state;
mod store;

pub use error::{Error, Result};
pub use hash::Hash;
pub use kind::{KIND_COUNT, ResourceKind};
pub use mark::{KindSets, PruneReplayer};
pub use prune::{KindStats, PruneOptions, PruneStats};
pub use record::{CompressionType, RecordHeader};
pub use replay::{StateCreator, StateReplayer};
pub use state::StateDocument;
pub use store::{OpenMode, PayloadMode, Store};
