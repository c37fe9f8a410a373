pub mod forge;
pub mod mock;
