pub mod coordinates;
pub mod documents;
pub mod fields;
pub mod hashes;
pub mod pdf;
pub mod pipeline;
pub mod projection;
pub mod render;
pub mod sample;
pub mod storage;
