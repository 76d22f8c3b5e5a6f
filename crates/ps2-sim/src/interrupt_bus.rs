use ps2_protocol::{Error, HookId, InterruptBus, Result};

/// Scripted notification system.
///
/// Records every subscribe/unsubscribe call so recovery tests can assert on
/// exact counts, and can be told to refuse exclusive grants or to fail a run
/// of unsubscribe attempts.
#[derive(Debug, Default)]
pub struct SimInterruptBus {
    pub active: Vec<HookId>,
    pub subscribe_calls: u32,
    pub unsubscribe_calls: u32,
    refuse_exclusive: bool,
    fail_unsubscribes: u32,
}

impl SimInterruptBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse exclusive subscriptions, as a notification system that only
    /// offers shared delivery would.
    pub fn refuse_exclusive(&mut self) {
        self.refuse_exclusive = true;
    }

    /// Fail the next `times` unsubscribe attempts before succeeding.
    pub fn fail_unsubscribes(&mut self, times: u32) {
        self.fail_unsubscribes = times;
    }

    pub fn is_subscribed(&self, line: u8) -> bool {
        self.active.iter().any(|hook| hook.line == line)
    }
}

impl InterruptBus for SimInterruptBus {
    fn subscribe(&mut self, line: u8, bit: u8, exclusive: bool) -> Result<HookId> {
        self.subscribe_calls += 1;
        if exclusive && self.refuse_exclusive {
            return Err(Error::Subscribe { line });
        }
        if self.is_subscribed(line) {
            // One exclusive owner per line.
            return Err(Error::Subscribe { line });
        }
        let hook = HookId { line, bit };
        self.active.push(hook);
        Ok(hook)
    }

    fn unsubscribe(&mut self, hook: HookId) -> Result<()> {
        self.unsubscribe_calls += 1;
        if self.fail_unsubscribes > 0 {
            self.fail_unsubscribes -= 1;
            return Err(Error::Unsubscribe { line: hook.line });
        }
        match self.active.iter().position(|h| *h == hook) {
            Some(i) => {
                self.active.remove(i);
                Ok(())
            }
            None => Err(Error::Unsubscribe { line: hook.line }),
        }
    }
}
