#![warn(missing_docs)]
//! Client session orchestration: the per-connection state machine and the async
//! loop that feeds it frames and local ticks.

pub mod driver;
pub mod session;

pub use driver::{run, DriverExit, DriverOptions, IdleInput, InputSource, NullPresenter, Presenter};
pub use session::{ConnectionState, PendingInvite, Session, SessionEvent, TickOutcome};
