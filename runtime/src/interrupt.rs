use alloc::vec::Vec;
use primitive_types::{H160, U256};

use crate::{eval, ExitFatal, ExitReason, Handler, Runtime};

/// What a trapped `CREATE`/`CALL` is waiting on: the interrupt value the
/// `Handler` produced, plus a token that resumes the runtime once the
/// caller has run the child frame to completion.
pub enum Resolve<'a, H: Handler> {
	Create(H::CreateInterrupt, ResolveCreate<'a>),
	Call(H::CallInterrupt, ResolveCall<'a>),
}

/// Resolves a trapped `CREATE`. Dropping this without calling [`Self::finish`]
/// poisons the runtime to `ExitFatal::UnhandledInterrupt` — a trap silently
/// discarded by the caller would otherwise leave the runtime's frame stuck
/// mid-instruction forever.
pub struct ResolveCreate<'a> {
	runtime: Option<&'a mut Runtime>,
}

impl<'a> ResolveCreate<'a> {
	pub(crate) fn new(runtime: &'a mut Runtime) -> Self {
		Self {
			runtime: Some(runtime),
		}
	}

	/// Feed the completed child frame's result back in, pushing the
	/// deployed address (or zero, on failure) onto the parent's stack.
	pub fn finish(
		mut self,
		reason: ExitReason,
		address: Option<H160>,
		return_data: Vec<u8>,
	) -> Result<(), ExitReason> {
		let runtime = self.runtime.take().expect("ResolveCreate finished twice");
		eval::finish_create(runtime, reason, address, return_data)
	}
}

impl<'a> Drop for ResolveCreate<'a> {
	fn drop(&mut self) {
		if let Some(runtime) = self.runtime.take() {
			runtime.status = Err(ExitFatal::UnhandledInterrupt.into());
			runtime.machine.exit(ExitFatal::UnhandledInterrupt.into());
		}
	}
}

/// Resolves a trapped `CALL`. See [`ResolveCreate`] for the poison-on-drop
/// rationale.
pub struct ResolveCall<'a> {
	runtime: Option<&'a mut Runtime>,
}

impl<'a> ResolveCall<'a> {
	pub(crate) fn new(runtime: &'a mut Runtime) -> Self {
		Self {
			runtime: Some(runtime),
		}
	}

	/// Feed the completed child frame's result back in, copying its return
	/// data into the caller-requested output range and pushing the
	/// success/failure flag.
	pub fn finish(
		mut self,
		out_offset: U256,
		out_len: U256,
		reason: ExitReason,
		return_data: Vec<u8>,
	) -> Result<(), ExitReason> {
		let runtime = self.runtime.take().expect("ResolveCall finished twice");
		eval::finish_call(runtime, out_len, out_offset, reason, return_data)
	}
}

impl<'a> Drop for ResolveCall<'a> {
	fn drop(&mut self) {
		if let Some(runtime) = self.runtime.take() {
			runtime.status = Err(ExitFatal::UnhandledInterrupt.into());
			runtime.machine.exit(ExitFatal::UnhandledInterrupt.into());
		}
	}
}
