//! Launch pipeline for finalized HSA kernels
//!
//! A [`Kernel`] pairs a shared, immutable [`KernelHandle`] with a
//! value-semantics [`KernelConfiguration`]. Launching binds argument values
//! to the kernel's formal types and submits one dispatch:
//!
//! ```text
//! Kernel::configure / Kernel::grid ──▶ Kernel (new value)
//!                                         │ launch(ctx, args)
//!                                         ▼
//!   resolve symbol ─▶ finalize ─▶ allocate kernarg ─▶ marshal ─▶ dispatch ─▶ free
//! ```
//!
//! The device is reached only through the [`hsa_driver`] traits, so any
//! [`DeviceContext`] works; the in-process [`hsa_driver::HostContext`] is
//! used below.
//!
//! ```rust
//! use hsa_driver::{HostContext, ImageBuilder};
//! use hsa_launch::{ArgType, ArgValue, Dims, HostArray, Kernel, KernelHandle, NativeImage, ScalarType};
//!
//! let ctx = HostContext::new();
//! let image = NativeImage::new("", ImageBuilder::new().symbol("&scale", 0x100).build());
//! let handle = KernelHandle::new(
//!     image,
//!     "scale",
//!     vec![ArgType::array(ScalarType::F32, 1), ScalarType::F32.into()],
//! );
//!
//! let data = [1.0f32, 2.0, 3.0, 4.0];
//! let kernel = Kernel::new(handle).configure(4, Some(Dims::from(2)), None)?;
//! kernel.launch(
//!     &ctx,
//!     &[HostArray::from_slice(&data, &[4]).unwrap().into(), ArgValue::from(0.5f32)],
//! )?;
//!
//! assert_eq!(ctx.host_queue().dispatch_count(), 1);
//! # Ok::<(), hsa_launch::LaunchError>(())
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod options;

pub use config::KernelConfiguration;
pub use dispatch::launch;
pub use error::{LaunchError, Result};
pub use geometry::{Dims, LaunchGeometry};
pub use kernel::{Kernel, KernelHandle, NativeImage};
pub use options::{LaunchOptions, DEFAULT_SYMBOL_PREFIX};

pub use hsa_driver::{DeviceContext, StreamHandle};
pub use hsa_kernarg::{ArgType, ArgValue, Complex32, Complex64, HostArray, KernargAbi, ScalarType};
