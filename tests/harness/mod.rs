// tests/harness/mod.rs
//
// Integration testing harness for mailbox-leads.
// Provides an in-memory IMAP server, scripted LLM and DNS answers, and time control.

pub mod fixtures;
pub mod mock_client;
pub mod mock_dns;
pub mod mock_llm;
pub mod test_harness;
pub mod virtual_clock;
pub mod virtual_mailbox;

pub use mock_client::RecordedAction;
pub use mock_dns::StaticMx;
pub use mock_llm::ScriptedProvider;
pub use test_harness::TestHarness;
pub use virtual_mailbox::InboxMessage;
