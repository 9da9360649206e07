pub mod sharded_lru;
