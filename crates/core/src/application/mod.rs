// Application Layer - Use Cases and Business Logic

pub mod intake;
pub mod review;
pub mod worker;

// Re-exports
pub use intake::{IntakeService, SubmitOutcome};
pub use review::ReviewProcessor;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
