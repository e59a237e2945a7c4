//! Turning raw utterances into classified operations.

mod interpreter;
mod splitter;

pub use interpreter::{CommandInterpreter, Operation, OperationKind};
pub use splitter::CommandSplitter;
