//! Hooks for observing a `Runtime` from the outside — a debugger, a trace
//! exporter, a fuzzer's coverage collector — without threading a listener
//! parameter through every opcode handler. Enable the `tracing` feature
//! for events to be emitted; with it off, `emit` compiles away to nothing.

use crate::{Capture, Context, ExitReason, Memory, Opcode, Stack, Trap};
use primitive_types::{H160, H256};

#[cfg(feature = "tracing")]
environmental::environmental!(listener: dyn EventListener + 'static);

pub trait EventListener {
	fn event(&mut self, event: Event);
}

#[derive(Debug, Copy, Clone)]
pub enum Event<'a> {
	/// About to execute `opcode` with the stack/memory it currently sees.
	Step {
		context: &'a Context,
		opcode: Opcode,
		position: &'a Result<usize, ExitReason>,
		stack: &'a Stack,
		memory: &'a Memory,
	},
	/// `Step`'s opcode just finished, one way or another.
	StepResult {
		result: &'a Result<(), Capture<ExitReason, Trap>>,
		return_value: &'a [u8],
	},
	SLoad {
		address: H160,
		index: H256,
		value: H256,
	},
	SStore {
		address: H160,
		index: H256,
		value: H256,
	},
}

#[cfg(feature = "tracing")]
pub(crate) fn emit<'a, F: FnOnce() -> Event<'a>>(event: F) {
	listener::with(|listener| listener.event(event()));
}

#[cfg(not(feature = "tracing"))]
#[allow(dead_code)]
pub(crate) fn emit<'a, F: FnOnce() -> Event<'a>>(_event: F) {}

/// Run `f` with `new` installed as the active listener for its duration.
#[cfg(feature = "tracing")]
pub fn using<R, F: FnOnce() -> R>(new: &mut (dyn EventListener + 'static), f: F) -> R {
	listener::using(new, f)
}
