pub mod bang;
pub mod command;
pub mod frame;

pub use bang::{split_bang_header, BangHeader};
pub use command::{parse as parse_command, Command};
pub use frame::{read_frame, write_frame};
