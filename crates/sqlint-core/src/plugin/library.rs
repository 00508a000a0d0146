//! Dynamic library handle for plugin modules.
//!
//! Cross-platform loading of shared libraries (.so, .dylib, .dll). Each
//! handle is the isolation boundary for one plugin: symbols are resolved
//! locally (`RTLD_LOCAL`), so two plugins may carry incompatible versions of
//! the same dependency without conflict, and the handle is the unit of
//! unloading; dropping it releases everything loaded through it.

use std::path::Path;
use thiserror::Error;

#[cfg(unix)]
use std::ffi::{CStr, CString};

/// Errors that can occur while loading a plugin library.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Library file not found or could not be loaded.
    #[error("library not found: {path}")]
    NotFound { path: String },

    /// Symbol not found in the library.
    #[error("symbol not found: {symbol} in {library}")]
    SymbolNotFound { symbol: String, library: String },

    /// The plugin declaration was built against an incompatible host.
    #[error("incompatible plugin interface: {0}")]
    IncompatibleInterface(String),

    /// The plugin's registration entry point panicked.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// Platform-specific loading error.
    #[error("platform error: {0}")]
    PlatformError(String),

    /// Invalid path encoding.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// One loaded plugin library.
pub struct PluginLibrary {
    handle: LibraryHandle,
    path: String,
}

impl PluginLibrary {
    /// Loads a shared library from `path`.
    ///
    /// On Unix this uses `dlopen(RTLD_NOW | RTLD_LOCAL)`: all symbols resolve
    /// immediately and stay private to this handle. On Windows it uses
    /// `LoadLibraryW`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{path_ref:?}")))?;

        let handle = LibraryHandle::load(path_str)?;

        Ok(PluginLibrary {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Resolves a symbol by name.
    ///
    /// # Safety
    ///
    /// The caller must ensure the symbol exists with the type `T` and that
    /// anything derived from it does not outlive this handle.
    pub unsafe fn get<T>(&self, symbol: &str) -> Result<T, LoadError> {
        self.handle.symbol(symbol, &self.path)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(windows)]
type LibraryHandle = WindowsLibrary;

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        let c_path = CString::new(path)
            .map_err(|e| LoadError::PlatformError(format!("invalid path: {e}")))?;

        // RTLD_NOW: resolve all symbols immediately.
        // RTLD_LOCAL: symbols stay private to this handle.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

        if handle.is_null() {
            let error = unsafe {
                let err_ptr = libc::dlerror();
                if err_ptr.is_null() {
                    "unknown error".to_string()
                } else {
                    CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
                }
            };

            return Err(LoadError::NotFound {
                path: format!("{path}: {error}"),
            });
        }

        Ok(UnixLibrary { handle })
    }

    unsafe fn symbol<T>(&self, name: &str, lib_path: &str) -> Result<T, LoadError> {
        let c_name = CString::new(name)
            .map_err(|e| LoadError::PlatformError(format!("invalid symbol name: {e}")))?;

        // Clear any previous error state before the lookup.
        libc::dlerror();

        let symbol = libc::dlsym(self.handle, c_name.as_ptr());

        let err_ptr = libc::dlerror();
        if !err_ptr.is_null() {
            let error = CStr::from_ptr(err_ptr).to_string_lossy().into_owned();
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{lib_path}: {error}"),
            });
        }

        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: lib_path.to_string(),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

#[cfg(windows)]
struct WindowsLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(windows)]
impl WindowsLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;

        let wide: Vec<u16> = OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };

        if handle.is_null() {
            let error = unsafe { GetLastError() };
            return Err(LoadError::NotFound {
                path: format!("{path} (error code: {error})"),
            });
        }

        Ok(WindowsLibrary { handle })
    }

    unsafe fn symbol<T>(&self, name: &str, lib_path: &str) -> Result<T, LoadError> {
        let c_name = std::ffi::CString::new(name)
            .map_err(|e| LoadError::PlatformError(format!("invalid symbol name: {e}")))?;

        let symbol = GetProcAddress(self.handle, c_name.as_ptr());

        if symbol.is_null() {
            let error = GetLastError();
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{lib_path} (error code: {error})"),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(windows)]
impl Drop for WindowsLibrary {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

#[cfg(windows)]
unsafe impl Send for WindowsLibrary {}
#[cfg(windows)]
unsafe impl Sync for WindowsLibrary {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(
        module: *mut std::ffi::c_void,
        procname: *const i8,
    ) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
    fn GetLastError() -> u32;
}
