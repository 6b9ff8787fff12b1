pub mod layer;
pub mod summary;
