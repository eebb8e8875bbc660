#![cfg_attr(not(feature = "std"), no_std)]
//! Core execution primitives for the evmx interpreter: a bounded 256-bit
//! stack, a lazily-extended byte memory, a code stream with jump-destination
//! analysis, and the opcode/exit-reason vocabulary shared by every other
//! crate in the workspace.

extern crate alloc;

mod error;
mod eval;
mod machine;
mod memory;
mod opcode;
mod stack;
mod utils;
mod valids;

pub use crate::error::{Capture, ExitError, ExitFatal, ExitReason, ExitRevert, ExitSucceed, Trap};
pub use crate::machine::Machine;
pub use crate::memory::Memory;
pub use crate::opcode::Opcode;
pub use crate::stack::Stack;
pub use crate::utils::{Sign, I256};
pub use crate::valids::Valids;
