//! Application wiring between the CLI surface and the policy engine.

pub mod dispatch;
