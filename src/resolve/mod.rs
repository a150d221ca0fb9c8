pub mod collections;
pub mod components;
pub mod inject;
pub mod references;
