//! Outbound synchronization: durable queue, remote seam and drain loop.
//!
//! # Responsibility
//! - Hold pending operations in enqueue order until they are applied remotely.
//! - Drain the queue against a remote document store when online.
//! - Schedule drains at startup, on reconnect and on a fixed interval.
//!
//! # Invariants
//! - Operations are applied strictly in enqueue order.
//! - A failed operation stays queued and is retried on the next pass.
//! - At most one drain pass runs at a time per processor.

pub mod connectivity;
pub mod processor;
pub mod queue;
pub mod remote;
pub mod scheduler;
