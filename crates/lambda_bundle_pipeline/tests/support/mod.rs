pub mod installer;
pub mod project;
