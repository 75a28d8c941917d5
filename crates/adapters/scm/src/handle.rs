//! Owned service control manager handles, closed on drop.

use std::ptr;

use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::Security::SC_HANDLE;
use windows_sys::Win32::System::Services::{
    CloseServiceHandle, OpenSCManagerW, OpenServiceW, SC_MANAGER_ALL_ACCESS, SERVICE_ALL_ACCESS,
};

use svcwatch_domain::error::{ScmError, SystemErrorCode};
use svcwatch_domain::service::ServiceName;

/// Session on the local service control manager (active database).
#[derive(Debug)]
pub struct ScManager(SC_HANDLE);

impl ScManager {
    /// Open the manager with full access. Requires an elevated process.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::ManagerUnavailable`] with `GetLastError`.
    pub fn open() -> Result<Self, ScmError> {
        // SAFETY: null machine and database names select the local active database.
        let handle = unsafe { OpenSCManagerW(ptr::null(), ptr::null(), SC_MANAGER_ALL_ACCESS) };
        if handle == 0 {
            return Err(ScmError::ManagerUnavailable { code: last_error() });
        }
        Ok(Self(handle))
    }
}

impl Drop for ScManager {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by OpenSCManagerW and is closed once.
        unsafe { CloseServiceHandle(self.0) };
    }
}

/// Handle on one installed service.
#[derive(Debug)]
pub struct ScService {
    handle: SC_HANDLE,
    name: ServiceName,
}

impl ScService {
    /// # Errors
    ///
    /// Returns [`ScmError::ServiceUnavailable`] with `GetLastError`, e.g.
    /// `1060` when no such service is installed.
    pub fn open(manager: &ScManager, name: &ServiceName) -> Result<Self, ScmError> {
        let wide = name.to_wide();
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        let handle = unsafe { OpenServiceW(manager.0, wide.as_ptr(), SERVICE_ALL_ACCESS) };
        if handle == 0 {
            return Err(ScmError::ServiceUnavailable {
                service: name.clone(),
                code: last_error(),
            });
        }
        Ok(Self {
            handle,
            name: name.clone(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    pub(crate) fn raw(&self) -> SC_HANDLE {
        self.handle
    }
}

impl Drop for ScService {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by OpenServiceW and is closed once.
        unsafe { CloseServiceHandle(self.handle) };
    }
}

pub(crate) fn last_error() -> SystemErrorCode {
    // SAFETY: reads the calling thread's last-error value.
    SystemErrorCode::from_raw(unsafe { GetLastError() })
}
