//! Kernel argument ABI for HSA kernel launches.
//!
//! This crate turns host-side argument values into the raw cells a kernel
//! argument ("kernarg") buffer holds:
//!
//! ```text
//! ArgValue + ArgType ──marshal()──▶ NativeSlot { cell, keep_alive }
//!                                        │
//!                     KernargLayout ─────┤ write_slot()
//!                                        ▼
//! ┌──────────────────────────┬────────┬────────┬─────┐
//! │ injected slots (zeroed)  │ arg 0  │ arg 1  │ ... │
//! └──────────────────────────┴────────┴────────┴─────┘
//! ```
//!
//! Array arguments are passed by reference to an [`ArrayDescriptor`] owned
//! by the slot; the descriptor must stay alive until the dispatch that reads
//! the buffer has been submitted.

pub mod abi;
pub mod descriptor;
pub mod error;
pub mod marshal;
pub mod reader;
pub mod slot;
pub mod types;
pub mod value;

pub use abi::{KernargAbi, KernargLayout, DEFAULT_INJECTED_ARGS, KERNARG_ALIGNMENT, SLOT_SIZE};
pub use descriptor::ArrayDescriptor;
pub use error::{MarshalError, Result};
pub use marshal::{marshal, marshal_all};
pub use reader::ByteReader;
pub use slot::{NativeCell, NativeSlot};
pub use types::{ArgType, ScalarType};
pub use value::{ArgValue, Element, HostArray};

pub use num_complex::{Complex32, Complex64};
