#![allow(dead_code)]

mod data_rw;
mod setup;

pub use data_rw::*;
pub use setup::*;
