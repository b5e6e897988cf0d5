//! Server side: listener loop, dispatcher and stop flag.

pub mod dispatcher;
pub mod listener;
pub mod stop;

pub use dispatcher::RequestDispatcher;
pub use listener::{transition, AcceptEvent, ListeningServer, ServerState, StopReason};
pub use stop::StopHandle;
