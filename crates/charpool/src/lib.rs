#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod allocator;
mod alphabet;
mod error;
mod identity;
mod rand;
mod random_native;
mod service;
mod store;

pub use crate::allocator::*;
pub use crate::alphabet::*;
pub use crate::error::*;
pub use crate::identity::*;
pub use crate::rand::*;
pub use crate::random_native::*;
pub use crate::service::*;
pub use crate::store::*;
