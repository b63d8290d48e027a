pub mod cpu_exec;
pub mod expr;
pub mod watchpoint;

pub use cpu_exec::{ExecOutcome, Nemu, NemuState};
pub use expr::{expr, ExprContext};
pub use watchpoint::{WatchHit, Watchpoint, WatchpointPool};
