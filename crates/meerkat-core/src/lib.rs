//! Scheduling and orchestration engine of meerkat.
//!
//! - [`worker`]: single-consumer task queue drained by one dedicated thread.
//! - [`monitor`]: the capability contract every monitored source implements.
//! - [`operator`]: periodic, concurrent, fault-isolated check cycles over a monitor registry.
//! - [`factory`]: maps short codes to monitor constructors.
//! - [`event`]: lifecycle events published to observers (logging, metrics).

pub mod error;
pub use error::{CoreError, MonitorError, WorkerError};

pub mod event;
pub use event::{CycleKind, Event, EventKind, Subscribe};

pub mod factory;
pub use factory::MonitorFactory;

pub mod monitor;
pub use monitor::Monitor;

pub mod operator;
pub use operator::{AlarmListener, ExceptionListener, Operator, OperatorBuilder, OperatorConfig};

pub mod registry;
pub use registry::MonitorRegistry;

pub mod timer;
pub use timer::DriftTimer;

pub mod worker;
pub use worker::{Task, TaskSender, Worker};

mod sync;
