#![cfg_attr(not(feature = "std"), no_std)]
//! The `CALL`/`CREATE` recursion layer (§4.5, §4.9): a driver loop around
//! `evmx-core::Machine` that resolves the opcodes the core evaluator traps
//! on against a `Handler` impl, plus the fork-indexed `Config` every other
//! crate in the workspace reads its cost table and feature flags from.

extern crate alloc;

mod config;
mod context;
mod eval;
mod handler;
mod interrupt;
pub mod tracing;

pub use evmx_core::*;

pub use crate::config::{Config, Fork};
pub use crate::context::{CallScheme, Context, CreateScheme};
pub use crate::handler::{Handler, Transfer};
pub use crate::interrupt::{Resolve, ResolveCall, ResolveCreate};

/// Re-exports commonly needed alongside `Handler` impls, mirroring what a
/// `use evmx_runtime::prelude::*;` pulls in without dragging the whole
/// crate's internals into scope.
pub(crate) mod prelude {
	pub use alloc::vec::Vec;
}

use alloc::rc::Rc;
use alloc::vec::Vec;

/// Drive one opcode (or, unrolled via `run`, the whole program) through
/// `$self.machine`, calling `$handler.pre_validate` first so a gas-metering
/// or tracing handler sees every instruction before it executes — including
/// ones the core evaluator will reject outright (stack depth, invalid
/// jump). `$return`/`$err`/`$ok` thread through `step`'s `Result` and
/// `run`'s bare-`Capture` return shapes from one macro body.
macro_rules! step {
	( $self:expr, $handler:expr, $return:tt $($err:path)?; $($ok:path)? ) => ({
		if let Some((opcode, stack)) = $self.machine.inspect() {
			self::tracing::emit(|| self::tracing::Event::Step {
				context: &$self.context,
				opcode,
				position: &$self.machine.position(),
				stack,
				memory: $self.machine.memory(),
			});

			if let Err(error) = $handler.pre_validate(&$self.context, opcode, stack) {
				$self.machine.exit(error.clone().into());
				$self.status = Err(error.into());
			}
		}

		match $self.status.clone() {
			Ok(()) => (),
			Err(exit) => {
				#[allow(unused_parens)]
				$return $($err)*(Capture::Exit(exit))
			},
		}

		match $self.machine.step() {
			Ok(()) => $($ok)?(()),
			Err(Capture::Exit(exit)) => {
				$self.status = Err(exit.clone());
				#[allow(unused_parens)]
				$return $($err)*(Capture::Exit(exit))
			},
			Err(Capture::Trap(Trap::Opcode(opcode))) => {
				match eval::eval($self, opcode, $handler) {
					eval::Control::Continue => $($ok)?(()),
					eval::Control::CallInterrupt(interrupt) => {
						let resolve = ResolveCall::new($self);
						#[allow(unused_parens)]
						$return $($err)*(Capture::Trap(Resolve::Call(interrupt, resolve)))
					},
					eval::Control::CreateInterrupt(interrupt) => {
						let resolve = ResolveCreate::new($self);
						#[allow(unused_parens)]
						$return $($err)*(Capture::Trap(Resolve::Create(interrupt, resolve)))
					},
					eval::Control::Exit(exit) => {
						$self.machine.exit(exit.clone());
						$self.status = Err(exit.clone());
						#[allow(unused_parens)]
						$return $($err)*(Capture::Exit(exit))
					},
				}
			},
		}
	});
}

/// One call/create frame: the pure `Machine` underneath, the frame's
/// `Context` (address/caller/value), and the buffer `RETURNDATACOPY`/
/// `RETURNDATASIZE` read the previous child call's output from. Recursion
/// across frames lives above this type, in the `Handler` impl's `call`/
/// `create` methods.
pub struct Runtime {
	machine: Machine,
	status: Result<(), ExitReason>,
	return_data_buffer: Vec<u8>,
	context: Context,
}

impl Runtime {
	pub fn new(code: Rc<Vec<u8>>, data: Rc<Vec<u8>>, context: Context, config: &Config) -> Self {
		Self {
			machine: Machine::new(code, data, config.stack_limit, config.memory_limit),
			status: Ok(()),
			return_data_buffer: Vec::new(),
			context,
		}
	}

	pub fn machine(&self) -> &Machine {
		&self.machine
	}

	pub fn context(&self) -> &Context {
		&self.context
	}

	/// The previous child call's return data, as read by `RETURNDATACOPY`.
	pub fn return_data_buffer(&self) -> &[u8] {
		&self.return_data_buffer
	}

	/// Execute a single opcode, or report why the frame has already ended
	/// (`Ok` once it's fully done is never returned — callers loop on `Ok`
	/// until they get a `Capture`).
	pub fn step<'a, H: Handler>(
		&'a mut self,
		handler: &mut H,
	) -> Result<(), Capture<ExitReason, Resolve<'a, H>>> {
		step!(self, handler, return Err; Ok)
	}

	/// Run to completion: either the frame's own `ExitReason`, or a
	/// `Resolve` the caller must feed a child frame's result back into
	/// before continuing.
	pub fn run<'a, H: Handler>(&'a mut self, handler: &mut H) -> Capture<ExitReason, Resolve<'a, H>> {
		loop {
			step!(self, handler, return;)
		}
	}
}
