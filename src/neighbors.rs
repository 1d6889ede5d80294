//! The neighbor cache and Neighbor Unreachability Detection.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use anyhow::Result;
//! use ndisc::config::NdConfig;
//! use ndisc::hooks::{Hooks, LinkOutput};
//! use ndisc::interface::Interface;
//! use ndisc::models::{HeldPacket, LinkAddr, LinkType};
//! use ndisc::neighbors::Resolution;
//! use ndisc::NdContext;
//!
//! struct Discard;
//!
//! impl LinkOutput for Discard {
//!     fn transmit(&self, _ifp: &Interface, _dst: LinkAddr, _packet: &[u8]) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let config = NdConfig::default();
//! let ctx = NdContext::new(config.clone(), Hooks::new(Arc::new(Discard)));
//! let lladdr = LinkAddr::new(&[0x02, 0, 0, 0, 0, 1]).unwrap();
//! let settings = config.interface_settings();
//! let ifp = ctx
//!     .attach(Interface::new(1, "eth0", LinkType::Ethernet, Some(lladdr), settings))
//!     .unwrap();
//!
//! // The first packet to an unknown neighbor waits for address resolution.
//! let next_hop = "fe80::1".parse().unwrap();
//! let result = ctx.resolve(&ifp, next_hop, HeldPacket::new(vec![0; 40]));
//! assert_eq!(result, Ok(Resolution::Pending));
//! ```
mod cache;
mod entry;
pub mod gc;
mod nud;
mod onlink;
pub mod resolver;

pub use cache::*;
pub use entry::*;
pub use onlink::*;
pub use resolver::{Followup, NdDomain, NdTimer, Resolution};
