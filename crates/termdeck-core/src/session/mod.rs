//! Session manager: the single owner of PTY processes and scanner state.
//!
//! ```ignore
//! let (transport, mut display_rx) = ChannelTransport::new();
//! let manager = SessionManagerBuilder::new(settings)
//!     .with_transport(Arc::new(transport))
//!     .build()?;
//!
//! let mut events = manager.subscribe();
//! manager.create("tab-1", SessionOptions::default())?;
//! manager.write("tab-1", b"claude\r");
//! ```

mod builder;
mod fanout;
mod manager;
mod transport;

pub use builder::SessionManagerBuilder;
pub use manager::{SessionManager, SessionOptions};
pub use transport::{ChannelTransport, DisplayEvent, DisplayTransport, NullTransport};
