pub mod dispatcher;

pub use dispatcher::{DispatchError, Dispatcher, Outcome};
