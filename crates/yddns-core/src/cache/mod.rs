// # Cache Implementations
//
// This module provides implementations of the Cache trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

pub use crate::traits::cache::{
    CREATED_EXPIRY_SECS_DEFAULT, CacheItem, CacheSettings, Expiry, MODIFIED_EXPIRY_SECS_DEFAULT,
};
