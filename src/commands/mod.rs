pub mod controller;
pub mod parser;

pub use controller::{ChatController, Flow};
pub use parser::Command;
