//! Array descriptors passed to kernels by address
//!
//! Kernels receive array arguments as a pointer to a descriptor with the
//! lowered array layout, one pointer-width word per field:
//!
//! ```text
//! ┌─────────┬────────┬────────┬──────────┬──────┬────────────┬──────────────┐
//! │ meminfo │ parent │ nitems │ itemsize │ data │ shape[nd]  │ strides[nd]  │
//! └─────────┴────────┴────────┴──────────┴──────┴────────────┴──────────────┘
//! ```
//!
//! `meminfo` and `parent` are always null: the host keeps ownership of the
//! data and the descriptor carries no reference back to it.

use crate::value::HostArray;

const MEMINFO: usize = 0;
const PARENT: usize = 1;
const NITEMS: usize = 2;
const ITEMSIZE: usize = 3;
const DATA: usize = 4;
const HEADER_WORDS: usize = 5;

/// Heap-allocated descriptor for one array argument.
///
/// The words live in a boxed slice, so [`ArrayDescriptor::address`] stays
/// stable when the descriptor itself is moved.
#[derive(Debug, PartialEq, Eq)]
pub struct ArrayDescriptor {
    words: Box<[i64]>,
    ndim: usize,
}

impl ArrayDescriptor {
    /// Copy the base address, shape and strides out of `array`.
    pub fn from_array(array: &HostArray<'_>) -> Self {
        let ndim = array.ndim();
        let mut words = vec![0i64; HEADER_WORDS + 2 * ndim];

        words[MEMINFO] = 0;
        words[PARENT] = 0;
        words[NITEMS] = array.len() as i64;
        words[ITEMSIZE] = array.itemsize() as i64;
        words[DATA] = array.data_ptr() as usize as i64;

        for (dim, (&extent, &stride)) in array.shape().iter().zip(array.strides()).enumerate() {
            words[HEADER_WORDS + dim] = extent as i64;
            words[HEADER_WORDS + ndim + dim] = stride as i64;
        }

        Self {
            words: words.into_boxed_slice(),
            ndim,
        }
    }

    /// Address written into the kernarg slot
    pub fn address(&self) -> u64 {
        self.words.as_ptr() as usize as u64
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    pub fn size_bytes(&self) -> usize {
        std::mem::size_of_val(&*self.words)
    }

    pub fn meminfo(&self) -> i64 {
        self.words[MEMINFO]
    }

    pub fn parent(&self) -> i64 {
        self.words[PARENT]
    }

    pub fn nitems(&self) -> i64 {
        self.words[NITEMS]
    }

    pub fn itemsize(&self) -> i64 {
        self.words[ITEMSIZE]
    }

    /// Base address of the array data
    pub fn data(&self) -> u64 {
        self.words[DATA] as u64
    }

    pub fn shape(&self) -> &[i64] {
        &self.words[HEADER_WORDS..HEADER_WORDS + self.ndim]
    }

    pub fn strides(&self) -> &[i64] {
        &self.words[HEADER_WORDS + self.ndim..]
    }

    /// Raw descriptor bytes as the device reads them
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }
}
