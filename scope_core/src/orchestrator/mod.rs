pub mod events;
pub mod invocation;
pub mod metadata;
pub mod runner;
pub mod sink;

pub use events::{Outcome, ResultEnvelope};
pub use invocation::Invocation;
pub use metadata::EventMetadata;
pub use runner::{RunSummary, Runner, Task};
pub use sink::{result_channel, ResultReceiver, ResultSink};
