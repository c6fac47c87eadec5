pub mod cursor;
pub mod interrupt;
pub mod keys;
pub mod surface;
pub mod tui;
