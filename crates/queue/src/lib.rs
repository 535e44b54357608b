//! Job orchestration for herald.
//!
//! - **Jobs**: the queue registry and job envelope ([`jobs`])
//! - **Dispatcher**: batch submission with per-key dedup ([`Dispatcher`])
//! - **Backends**: Redis via apalis, and in-memory ([`backend`])
//! - **Retry**: per-job attempts and backoff ([`Backoff`])
//! - **Polling**: the cursor state machine ([`plan_poll`])
//! - **Workers**: every job handler behind one entry point ([`job_worker`])
//! - **Bootstrap**: seeding the polling streams at startup ([`bootstrap()`])

pub mod backend;
pub mod bootstrap;
pub mod dispatcher;
pub mod jobs;
pub mod polling;
pub mod retry;
pub mod workers;

pub use backend::{MemoryQueue, RedisQueue};
pub use bootstrap::bootstrap;
pub use dispatcher::{Dispatcher, EnqueueReport, QueueBackend, Requeue};
pub use jobs::*;
pub use polling::{PollPlan, plan_poll};
pub use retry::Backoff;
pub use workers::*;
