// clonewatch/src/state/mod.rs

pub mod cache;
