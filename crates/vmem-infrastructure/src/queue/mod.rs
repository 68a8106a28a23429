//! Queue coupling: redis transport and the two dispatchers.

pub mod dispatcher;
pub mod redis;

pub use dispatcher::{run_worker_loop, InProcessDispatcher, QueueDispatcher};
pub use redis::RedisJobQueue;
