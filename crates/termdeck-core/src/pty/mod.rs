//! PTY process ownership.
//!
//! [`PtyRegistry`] is the only path by which PTY processes are created,
//! written to, resized, or terminated. The OS side sits behind the
//! [`PtySpawner`] / [`PtyProcess`] traits so the registry can be driven by a
//! fake in tests.

pub mod env;
mod native;
mod registry;
pub mod shell;
mod spawner;

#[cfg(test)]
pub(crate) mod fake;

pub use native::NativePtySpawner;
pub use registry::{PtyRegistry, SessionError};
pub use shell::{PlatformShellResolver, ShellResolver};
pub use spawner::{PtyEventHandler, PtyProcess, PtySpawner, SpawnSpec};
