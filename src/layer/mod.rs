pub mod document;
pub mod dsl;
pub mod model;
