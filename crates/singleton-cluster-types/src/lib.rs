//! Types shared with the cluster scheduler that hosts singleton workers.

mod error;
mod handle;
mod priority;

pub use error::SchedulerError;
pub use handle::WorkerHandle;
pub use priority::Priority;
