//! Date-partitioned reading storage.
//!
//! The gateway for everything that touches the blob store (EMBP):
//! - `blob`: the [`BlobStore`] capability (put, get, list by prefix)
//! - `local`: filesystem-backed bucket used by the binaries
//! - `memory`: in-process bucket for tests and dry runs
//! - `readings`: [`ReadingStore`], the bronze/silver layer view on top

mod blob;
mod local;
mod memory;
mod readings;

pub use blob::{BlobStore, ObjectMeta};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use readings::{object_key, timestamp_from_key, Layer, ReadingStore};
