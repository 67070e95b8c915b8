//! Wire protocol for interactive session control sockets.
//!
//! Each interactive session hosts its own WebSocket server on a
//! dedicated port (see [`crate::session`]); this module only defines the
//! JSON frames exchanged over it.

mod protocol;

pub use protocol::{ClientFrame, CommandType, ServerFrame};
