// clonewatch/src/engine/mod.rs

pub mod brand;
pub mod dispatcher;
pub mod explain;
pub mod fusion;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod weights;
