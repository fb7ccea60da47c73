pub mod date;
pub mod engine;
pub mod escape;

pub use engine::{expand_template, PlaceholderContext};
