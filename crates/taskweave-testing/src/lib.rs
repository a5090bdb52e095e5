//! # Taskweave Testing
//!
//! Predictable agent implementations and harness helpers for exercising
//! the runtime in tests: scripted success/failure responses, injectable
//! delays, agents that ignore cancellation, and call tracking.

mod harness;
mod mock_agents;

pub use harness::TestRuntime;
pub use mock_agents::MockAgent;
