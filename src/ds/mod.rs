pub mod bucket;
pub mod clock;
pub mod hash_table;
pub mod oldest_k;
pub mod slot;

pub use bucket::{Bucket, Entry};
pub use clock::TouchClock;
pub use hash_table::HashTable;
pub use oldest_k::OldestK;
pub use slot::SlotSelector;
