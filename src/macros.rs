//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate when working
//! with on-disk structures.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types (U16, U32, F32).
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::{U32, F32};
//!
//! #[repr(C)]
//! struct Header {
//!     root_block: U32,
//!     min_key: F32,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         root_block: u32,
//!         min_key: f32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn root_block(&self) -> u32 { self.root_block.get() }
//! // pub fn set_root_block(&mut self, val: u32) { self.root_block = U32::new(val); }
//! // pub fn min_key(&self) -> f32 { self.min_key.get() }
//! // pub fn set_min_key(&mut self, val: f32) { self.min_key = F32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u16) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u16 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u16) {
                self.$field = ::zerocopy::little_endian::U16::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, f32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> f32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: f32) {
                self.$field = ::zerocopy::little_endian::F32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}

/// Generates only getter methods for zerocopy little-endian fields (read-only).
#[macro_export]
macro_rules! zerocopy_getters {
    ($($field:ident : $native_ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $field(&self) -> $native_ty {
                self.$field.get()
            }
        )*
    };
}
