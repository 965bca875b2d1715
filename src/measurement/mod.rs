//! Readers and writers for ArgyllCMS data files

pub mod cal;
pub mod cgats;
pub mod ti3;

pub use cgats::{CgatsDocument, CgatsError};
