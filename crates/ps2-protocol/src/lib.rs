#![forbid(unsafe_code)]

//! Protocol engine for the shared legacy (i8042-style) input controller.
//!
//! The crate covers the byte-oriented command/response protocol with retry
//! and resend semantics, scancode decoding, mouse packet framing with
//! sync-bit resynchronization, and per-device session management with a
//! best-effort recovery path. Hardware access and interrupt delivery are
//! both behind traits ([`PortIo`], [`InterruptBus`]) so the whole engine
//! runs unmodified against a simulator; `ps2-sim` provides one.
//!
//! Layering, leaves first: [`io::Controller`] (raw register access with
//! bounded retry), the command layer in [`command`], the per-device stream
//! state machines in [`keyboard`] and [`mouse`], and [`session`]/[`engine`]
//! on top.

pub mod command;
pub mod engine;
pub mod error;
pub mod event;
pub mod io;
pub mod keyboard;
pub mod mouse;
pub mod regs;
pub mod session;

pub use command::{CommandTarget, MouseConfig};
pub use engine::Engine;
pub use error::{Error, Result};
pub use event::{InputEvent, Notification};
pub use io::{Controller, PortIo, Register, RetryPolicy};
pub use keyboard::{KeyDirection, KeyEvent, ScancodeDecoder};
pub use mouse::{MousePacket, PacketFramer, ProtocolMode};
pub use session::{DeviceSession, HookId, InterruptBus, PeripheralKind};
