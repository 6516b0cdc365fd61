pub mod generate;
pub mod markers;
pub mod turn;

pub use generate::generate as run_generation;
pub use turn::take_turn;
