pub mod package;
pub mod parts;
pub mod tree;
pub mod writer;
pub mod xml;
