use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the protocol engine.
///
/// Framing anomalies (overflow packets, desynchronized mouse bytes) are
/// deliberately absent: the framer handles those internally and they never
/// surface to callers. Everything here is either a transport failure that
/// survived the retry ceiling or a protocol-level disagreement the caller is
/// expected to answer with a session `reset()`.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw port access failed and kept failing for the whole retry budget.
    #[error("i/o port {port:#04x} access failed")]
    Port { port: u16 },

    /// The controller never freed its input buffer for a write.
    #[error("controller not ready for write after {attempts} attempts")]
    WriteTimedOut { attempts: u32 },

    /// No byte appeared in the output buffer within the retry budget.
    #[error("no data in output buffer after {attempts} attempts")]
    ReadTimedOut { attempts: u32 },

    /// Parity or timeout error flagged on a received byte. Not retried:
    /// re-reading an electrically bad byte cannot help.
    #[error("parity/timeout error on received byte (status {status:#04x})")]
    DataIntegrity { status: u8 },

    /// The device answered something other than ACK or RESEND.
    #[error("unrecognized response from device: {response:#04x}")]
    UnexpectedResponse { response: u8 },

    /// The device kept asking for a resend until the command layer ran out
    /// of patience.
    #[error("device still requesting resend after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The notification system refused the subscription, or could not grant
    /// it exclusively.
    #[error("failed to subscribe irq line {line}")]
    Subscribe { line: u8 },

    /// The notification system refused to release the hook.
    #[error("failed to unsubscribe hook on irq line {line}")]
    Unsubscribe { line: u8 },
}
