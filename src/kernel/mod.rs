// Scan scheduling kernel
// Single radio, no preemption. Requests queue up, one scan runs at a time,
// results are routed to whoever sits at the head of the queue.
//
// scheduler: the state machine, plain &mut self, no locking
// service:   the same behind a critical section, plus an async dispatch task;
//            handlers run with the lock released

pub mod event;
pub mod queue;
pub mod scheduler;
pub mod service;

pub use event::{ScanEvent, ScanHandler};
pub use queue::{QueueFull, RequestQueue, ScanRequest};
pub use scheduler::{
    Cycle, DEFAULT_QUEUE_SIZE, DefaultScheduler, Finished, Lease, ScanScheduler,
};
pub use service::{DefaultService, ScanService};
