pub mod listen;
pub mod send;
