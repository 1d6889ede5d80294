#![doc = include_str!("../README.md")]

pub mod builder;
pub mod config;
pub mod context;
pub mod dad;
pub mod error;
pub mod hooks;
pub mod interface;
pub mod logger;
pub mod models;
pub mod neighbors;
pub mod options;
pub mod parser;
pub mod protocol;
pub mod statistics;
pub mod timer;
pub mod timer_loop;
pub mod utilities;

pub use context::*;
pub use dad::DadProgress;
pub use error::*;
pub use timer_loop::*;
