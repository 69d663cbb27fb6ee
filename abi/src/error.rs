//! Error types shared by the memory manager and the process subsystem

use core::ffi::c_int;
use core::fmt;

/// Implement common methods for kernel error enums.
///
/// Generates `as_c_int()`, `from_c_int()`, `is_success()`, and `is_error()` methods
/// for `#[repr(i32)]` error enums that follow the kernel's error convention.
macro_rules! impl_kernel_error {
    ($ty:ty, fallback: $fallback:ident, variants: { $($val:literal => $variant:ident),* $(,)? }) => {
        impl $ty {
            /// Convert to C-style integer for sentinel returns.
            #[inline]
            pub fn as_c_int(self) -> c_int {
                self as c_int
            }

            /// Convert from C-style integer.
            #[inline]
            pub fn from_c_int(val: c_int) -> Self {
                match val {
                    $($val => Self::$variant,)*
                    _ => Self::$fallback,
                }
            }

            /// Check if this is a success result.
            #[inline]
            pub fn is_success(self) -> bool {
                matches!(self, Self::Success)
            }

            /// Check if this is an error result.
            #[inline]
            pub fn is_error(self) -> bool {
                !self.is_success()
            }
        }
    };
}

/// Kernel operation result type
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors returned by heap, process and mailbox operations
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelError {
    /// Operation succeeded
    #[default]
    Success = 0,
    /// Zero-length request or a pointer the heap could never have handed out
    InvalidArgument = -1,
    /// Pointer or range outside the heap bounds
    OutOfRange = -2,
    /// Release would overlap a region that is already free
    Corruption = -3,
    /// No fitting heap region, no free pid slot, or mailbox already occupied
    ExhaustedResource = -4,
    /// Invalid or free pid, or a state transition that does not apply
    InvalidState = -5,
}

impl_kernel_error!(KernelError, fallback: InvalidArgument, variants: {
    0 => Success,
    -1 => InvalidArgument,
    -2 => OutOfRange,
    -3 => Corruption,
    -4 => ExhaustedResource,
    -5 => InvalidState,
});

impl KernelError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidArgument => "invalid argument",
            Self::OutOfRange => "out of range",
            Self::Corruption => "free list corruption",
            Self::ExhaustedResource => "resource exhausted",
            Self::InvalidState => "invalid state",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flatten a unit result into the sentinel convention (0 or negative code).
#[inline]
pub fn result_to_c_int(result: KernelResult<()>) -> c_int {
    match result {
        Ok(()) => KernelError::Success.as_c_int(),
        Err(err) => err.as_c_int(),
    }
}
