pub mod dispatcher;
pub mod exec;
pub mod injector;
pub mod registry;

pub use dispatcher::{dispatch_result_event, DispatchOutcome};
pub use injector::{FrontApp, InputInjector, NullInputInjector, ProcessInputInjector};
pub use registry::{ActionKind, ActionRef, ActionRegistry};
