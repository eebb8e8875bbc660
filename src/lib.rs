#![cfg_attr(not(feature = "std"), no_std)]
//! A stack-based, gas-metered Ethereum Virtual Machine interpreter (§1-2):
//! a `Machine`/`Runtime` evaluation loop (`evmx-core`/`evmx-runtime`), a
//! `Gasometer` cost model (`evmx-gasometer`), a `PrecompileSet`
//! (`evmx-precompile`), and the `StackExecutor`/`Ledger` that tie them to an
//! external world-state implementation.

extern crate alloc;

pub use evmx_core::*;
pub use evmx_runtime::{CallScheme, Config, Context, CreateScheme, Fork, Handler, Transfer};
pub use evmx_gasometer as gasometer;
pub use evmx_precompile as precompile;

pub mod backend;
pub mod executor;
pub mod ledger;
pub mod message;

pub use backend::MemoryLedger;
pub use executor::StackExecutor;
pub use ledger::{Ledger, SnapshotId};
pub use message::{Computation, Log, Message, MessageKind};
