pub mod candidate;
pub mod catalog;
pub mod line_item;
