pub mod archive;
pub mod copy;
pub mod installer;
pub mod staging;
