//! Change-notification primitives resolved from `SecHost.dll` at call time.
//!
//! `SubscribeServiceChangeNotifications` and its counterpart only exist on
//! Windows 8 and later, so they are not linked. Each call loads the library,
//! resolves the symbol, calls it and releases the library again; the
//! [`Library`] guard guarantees the release on every path.

use std::ffi::{CStr, c_void};
use std::{mem, ptr};

use windows_sys::Win32::Foundation::HMODULE;
use windows_sys::Win32::Security::SC_HANDLE;
use windows_sys::Win32::System::LibraryLoader::{FreeLibrary, GetProcAddress, LoadLibraryW};

use svcwatch_domain::error::SystemErrorCode;

use crate::handle::last_error;

/// `PSC_NOTIFICATION_REGISTRATION`.
pub(crate) type RawRegistration = *mut c_void;

/// `PSC_NOTIFICATION_CALLBACK`.
pub(crate) type NotificationCallback = unsafe extern "system" fn(u32, *const c_void);

type SubscribeFn = unsafe extern "system" fn(
    SC_HANDLE,
    i32,
    NotificationCallback,
    *const c_void,
    *mut RawRegistration,
) -> u32;

type UnsubscribeFn = unsafe extern "system" fn(RawRegistration);

type Symbol = unsafe extern "system" fn() -> isize;

const SECHOST: &str = "SecHost.dll";

/// `SC_EVENT_STATUS_CHANGE`.
const SC_EVENT_STATUS_CHANGE: i32 = 2;

struct Library(HMODULE);

impl Library {
    fn load() -> Result<Self, SystemErrorCode> {
        let wide: Vec<u16> = SECHOST.encode_utf16().chain(std::iter::once(0)).collect();
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        let module = unsafe { LoadLibraryW(wide.as_ptr()) };
        if module == 0 {
            return Err(last_error());
        }
        Ok(Self(module))
    }

    fn symbol(&self, name: &CStr) -> Option<Symbol> {
        // SAFETY: the module is loaded for the lifetime of `self`.
        unsafe { GetProcAddress(self.0, name.as_ptr().cast()) }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        // SAFETY: balances the LoadLibraryW in `load`.
        unsafe { FreeLibrary(self.0) };
    }
}

/// Call `SubscribeServiceChangeNotifications` for status-change events.
///
/// Returns a null registration with `GetLastError` when the library cannot
/// be loaded, and a null registration with a zero code when the symbol is
/// missing. Otherwise returns whatever the primitive produced.
pub(crate) fn subscribe(
    service: SC_HANDLE,
    callback: NotificationCallback,
    context: *const c_void,
) -> (RawRegistration, SystemErrorCode) {
    let library = match Library::load() {
        Ok(library) => library,
        Err(code) => return (ptr::null_mut(), code),
    };
    let Some(symbol) = library.symbol(c"SubscribeServiceChangeNotifications") else {
        return (ptr::null_mut(), SystemErrorCode::SUCCESS);
    };
    // SAFETY: the exported symbol has exactly this signature.
    let subscribe: SubscribeFn = unsafe { mem::transmute::<Symbol, SubscribeFn>(symbol) };

    let mut registration: RawRegistration = ptr::null_mut();
    // SAFETY: `service` is an open handle; `registration` is a valid out pointer.
    let status = unsafe {
        subscribe(
            service,
            SC_EVENT_STATUS_CHANGE,
            callback,
            context,
            &raw mut registration,
        )
    };
    (registration, SystemErrorCode::from_raw(status))
}

/// Call `UnsubscribeServiceChangeNotifications`.
///
/// Returns `false` when the primitive could not be reached, in which case
/// the registration may still be live.
pub(crate) fn unsubscribe(registration: RawRegistration) -> bool {
    let Ok(library) = Library::load() else {
        return false;
    };
    let Some(symbol) = library.symbol(c"UnsubscribeServiceChangeNotifications") else {
        return false;
    };
    // SAFETY: the exported symbol has exactly this signature.
    let unsubscribe: UnsubscribeFn = unsafe { mem::transmute::<Symbol, UnsubscribeFn>(symbol) };
    // SAFETY: `registration` was produced by a successful subscribe and is cancelled once.
    unsafe { unsubscribe(registration) };
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_load_and_release_sechost() {
        let library = Library::load().unwrap();
        assert!(library.symbol(c"SubscribeServiceChangeNotifications").is_some());
        assert!(library.symbol(c"UnsubscribeServiceChangeNotifications").is_some());
        assert!(library.symbol(c"svcwatch_missing_symbol").is_none());
    }
}
