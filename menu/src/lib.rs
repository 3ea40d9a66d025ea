pub mod cursor;
pub mod tree;

pub use cursor::Cursor;
pub use tree::{DataHandler, MenuData, MenuNode, MenuTree, NodeId, Shape};
