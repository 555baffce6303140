use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::{InterfaceCounters, NetworkInterface};
use crate::ports::CounterSource;

/// In-memory counter source for tests
#[derive(Default)]
pub struct FakeCounterSource {
    interfaces: Mutex<HashMap<String, (bool, InterfaceCounters)>>,
    failing: AtomicBool,
}

impl FakeCounterSource {
    pub fn with_interface(name: &str, is_up: bool, sent: u64, received: u64) -> Self {
        let source = Self::default();
        source.set(name, is_up, sent, received);
        source
    }

    pub fn set(&self, name: &str, is_up: bool, sent: u64, received: u64) {
        self.interfaces
            .lock()
            .unwrap()
            .insert(name.to_string(), (is_up, InterfaceCounters::new(sent, received)));
    }

    pub fn remove(&self, name: &str) {
        self.interfaces.lock().unwrap().remove(name);
    }

    /// Make every read of an existing interface fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("counter read failed".into());
        }
        Ok(())
    }
}

impl CounterSource for FakeCounterSource {
    fn interface_state(&self, name: &str) -> Result<Option<bool>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.interfaces.lock().unwrap().get(name).map(|(up, _)| *up))
    }

    fn read_counters(
        &self,
        name: &str,
    ) -> Result<Option<InterfaceCounters>, Box<dyn std::error::Error + Send + Sync>> {
        let interfaces = self.interfaces.lock().unwrap();
        match interfaces.get(name) {
            Some((_, counters)) => {
                self.check()?;
                Ok(Some(*counters))
            }
            None => Ok(None),
        }
    }

    fn list_interfaces(&self) -> Result<Vec<NetworkInterface>, Box<dyn std::error::Error + Send + Sync>> {
        self.check()?;
        let mut interfaces: Vec<_> = self
            .interfaces
            .lock()
            .unwrap()
            .iter()
            .map(|(name, (up, counters))| NetworkInterface::new(name.clone(), *up, *counters))
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }
}
