use std::path::{Path, PathBuf};

use libloading::Library;

/// A dynamically loaded driver module.
///
/// The image stays mapped until this object is dropped; anything holding a
/// symbol resolved from it must also hold (directly or through an
/// [`Arc`](std::sync::Arc)) this object.
pub(crate) struct SharedObject {
    path: PathBuf,
    library: Library,
}

impl SharedObject {
    /// Try to map the module at `path`; `None` when it cannot be loaded,
    /// so callers can move on to the next candidate.
    pub(crate) fn open(path: &Path) -> Option<SharedObject> {
        // SAFETY: loading a driver module runs its initialization code.
        // Modules are trusted native code following the cppdb driver
        // contract; there is no way to load them without executing it.
        match unsafe { Library::new(path) } {
            Ok(library) => Some(SharedObject {
                path: path.to_owned(),
                library,
            }),
            Err(error) => {
                tracing::trace!(
                    target: "cppdb::driver",
                    module = %path.display(),
                    %error,
                    "candidate module did not load"
                );
                None
            }
        }
    }

    /// Resolve `symbol`, with an error message naming the symbol and the
    /// module it was expected in.
    ///
    /// The caller asserts the type the module exports for this symbol.
    pub(crate) unsafe fn resolve<T: Copy>(&self, symbol: &str) -> Result<T, String> {
        match unsafe { self.library.get::<T>(symbol.as_bytes()) } {
            Ok(sym) => Ok(*sym),
            Err(_) => Err(format!(
                "failed to resolve symbol [{symbol}] in {}",
                self.path.display()
            )),
        }
    }
}
