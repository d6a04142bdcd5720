//! Context management: mode routing, history slicing and prompt assembly.

pub mod assembler;
pub mod history;
pub mod mode;

pub use assembler::{AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler};
pub use history::HistorySlice;
pub use mode::{ChatMode, Timeline};
