pub mod memory;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_support;

pub use memory::SessionMemory;
pub use orchestrator::{ChatError, ChatOrchestrator, ChatReply};
