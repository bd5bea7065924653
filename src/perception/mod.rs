pub mod coords;
pub mod grid;
pub mod types;
