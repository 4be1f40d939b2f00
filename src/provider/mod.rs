/// Provider Module
///
/// The Responses-style LLM provider integration: wire types, the adapter,
/// the bounded-concurrency poller, and the response normalizer.

pub mod adapter;
pub mod normalizer;
pub mod poller;
pub mod types;
