pub mod command;
pub mod data;
pub mod error;
pub mod objective;
pub mod parser;
pub mod sequence;
pub mod session;
pub mod timing;

pub use crate::error::{Error, Result};
