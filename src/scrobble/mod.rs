pub mod clock;
pub mod config;
pub mod fetch;
pub mod group;
pub mod normalize;
pub mod paths;
pub mod pipeline;
pub mod render;
pub mod signer;
pub mod staging;
