//! Input processing module
//! Reads candidate text and posting collections from disk

pub mod file_detector;
pub mod manager;

pub use manager::{InputManager, PostingBatch};
