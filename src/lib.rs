#![doc = include_str!("../README.md")]

pub mod hash;
pub use hash::{BuildKeyHash, BuildFnv1, BuildFnv1a};

pub mod sort;
pub mod stats;

pub mod search;
pub use search::{BuildConf, PerfectModulus, SearchExhausted, DEFAULT_ATTEMPT_LIMIT};

pub mod map;
pub use map::Map;

pub use dyn_size_of::GetSize;
