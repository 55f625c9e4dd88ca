//! Scenario tests across tools, registry, orchestrator and the facade.

pub(crate) mod support;

mod query_flow;
