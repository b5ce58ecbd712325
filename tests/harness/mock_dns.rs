// tests/harness/mock_dns.rs

use std::cell::Cell;

use mailbox_leads::resolver::{MxLookup, MxRecord};

/// Fixed MX answer with a query counter.
pub struct StaticMx {
    answer: Result<Vec<MxRecord>, String>,
    calls: Cell<usize>,
}

impl StaticMx {
    pub fn records(records: &[(u16, &str)]) -> Self {
        Self {
            answer: Ok(records
                .iter()
                .map(|(preference, exchange)| MxRecord {
                    preference: *preference,
                    exchange: exchange.to_string(),
                })
                .collect()),
            calls: Cell::new(0),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            answer: Err(msg.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MxLookup for &StaticMx {
    fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxRecord>, String> {
        self.calls.set(self.calls.get() + 1);
        self.answer.clone()
    }
}
