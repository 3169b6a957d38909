// crates/spot_interop/src/transform.rs
//! Conversions from the raw machine word a host event carries into the typed
//! argument its delegates receive.
//!
//! The host contract fixes what the word means for each event id (nothing, an
//! integer, or a pointer to a NUL-terminated buffer). The conversion cannot
//! check that, so each transform states its precondition and the ones that
//! dereference the word are `unsafe`. Event sources pair a transform with the
//! event id whose contract satisfies it; no other module reinterprets raw words.

use std::ffi::{c_char, CStr};
use std::marker::PhantomData;

pub trait ArgTransform: 'static {
    type Output;

    /// # Safety
    /// `raw` must have the provenance documented on the implementing type.
    unsafe fn transform(&self, raw: usize) -> Self::Output;
}

/// Passes the word through. Valid for every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOp;

impl ArgTransform for NoOp {
    type Output = usize;

    unsafe fn transform(&self, raw: usize) -> usize {
        raw
    }
}

/// Integer types a raw word can be cast to.
pub trait FromRawArg: Copy + 'static {
    fn from_raw(raw: usize) -> Self;
}

macro_rules! impl_from_raw_arg {
    ($($t:ty),*) => {
        $(impl FromRawArg for $t {
            #[inline]
            fn from_raw(raw: usize) -> Self {
                raw as $t
            }
        })*
    };
}

impl_from_raw_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Truncating reinterpretation of the word as an integer. Any word is valid.
#[derive(Clone, Copy, Debug)]
pub struct CastTo<T>(PhantomData<fn() -> T>);

impl<T> Default for CastTo<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: FromRawArg> ArgTransform for CastTo<T> {
    type Output = T;

    unsafe fn transform(&self, raw: usize) -> T {
        T::from_raw(raw)
    }
}

/// View of a writable host buffer. No copy is made.
///
/// Precondition: the word is null or points to a NUL-terminated buffer the host
/// allows the plug-in to modify, valid until the notification returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct CStrMut;

impl ArgTransform for CStrMut {
    type Output = *mut c_char;

    unsafe fn transform(&self, raw: usize) -> *mut c_char {
        raw as *mut c_char
    }
}

/// View of a read-only, host-owned C string. No copy is made.
///
/// Precondition: the word is null or points to a NUL-terminated string valid
/// until the notification returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct CStrRef;

impl ArgTransform for CStrRef {
    type Output = *const c_char;

    unsafe fn transform(&self, raw: usize) -> *const c_char {
        raw as *const c_char
    }
}

/// Owned copy of a host C string, up to the first NUL. Invalid UTF-8 is replaced.
/// A null word yields an empty string.
///
/// Precondition: the word is null or points to a NUL-terminated string.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnedString;

impl ArgTransform for OwnedString {
    type Output = String;

    unsafe fn transform(&self, raw: usize) -> String {
        if raw == 0 {
            return String::new();
        }
        CStr::from_ptr(raw as *const c_char).to_string_lossy().into_owned()
    }
}

/// Read a borrowed C-string argument, as delivered by [`CStrRef`].
///
/// # Safety
/// Same precondition as [`CStrRef`]; the result must not outlive the notification.
pub unsafe fn host_str<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_truncates_like_a_c_cast() {
        let word = 0x1_0000_0005usize;
        let value: i32 = unsafe { CastTo::<i32>::default().transform(word) };
        if std::mem::size_of::<usize>() == 8 {
            assert_eq!(value, 5);
        }
        let negative: i32 = unsafe { CastTo::<i32>::default().transform(usize::MAX) };
        assert_eq!(negative, -1);
    }

    #[test]
    fn owned_string_copies_up_to_first_nul() {
        let text = b"camera-7\0trailing\0";
        let owned = unsafe { OwnedString.transform(text.as_ptr() as usize) };
        assert_eq!(owned, "camera-7");
        assert_eq!(unsafe { OwnedString.transform(0) }, "");
    }

    #[test]
    fn views_do_not_copy() {
        let mut buf = *b"abc\0";
        let addr = buf.as_mut_ptr() as usize;
        let view = unsafe { CStrMut.transform(addr) };
        assert_eq!(view as usize, addr);
        let read = unsafe { CStrRef.transform(addr) };
        assert_eq!(unsafe { host_str(read) }.map(CStr::to_bytes), Some(&b"abc"[..]));
        assert!(unsafe { host_str(std::ptr::null()) }.is_none());
    }
}
