//! Data structures shared by the neighbor cache, the DAD engine and the protocol handlers.
mod held;
mod lladdr;
mod message;
mod protocols;
mod state;

pub use held::*;
pub use lladdr::*;
pub use message::*;
pub use protocols::*;
pub use state::*;
