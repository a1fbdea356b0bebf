use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend;
use crate::connection::{Connection, Live};
use crate::error::{Error, Result};
use crate::options::{ConnectionInfo, KEY_MODULE};
use crate::shared_object::SharedObject;

#[cfg(all(unix, not(target_os = "macos")))]
mod platform {
    pub const PREFIX: &str = "lib";
    pub const SUFFIX_V1: &str = ".so";
    pub const SUFFIX_V2: &str = ".so.0";
}

#[cfg(target_os = "macos")]
mod platform {
    pub const PREFIX: &str = "lib";
    pub const SUFFIX_V1: &str = ".dylib";
    pub const SUFFIX_V2: &str = ".dylib.0";
}

#[cfg(windows)]
mod platform {
    pub const PREFIX: &str = "";
    pub const SUFFIX_V1: &str = ".dll";
    pub const SUFFIX_V2: &str = "-0.dll";
}

/// A loaded engine backend.
///
/// Handles are shared (`Arc`): the driver manager's registry holds one
/// count and every connection minted from the driver holds another, so a
/// driver, and any shared object behind it, outlives its registry entry
/// for as long as one of its connections is open.
pub struct Driver {
    name: String,
    kind: DriverKind,
}

enum DriverKind {
    /// Statically linked engine; never collected, since it could not be
    /// loaded again.
    Static(Box<dyn backend::Driver>),
    /// Registered at run time; collected once no connection holds it.
    Installed(Box<dyn backend::Driver>),
    /// Resolved from a shared object; collected (and the library
    /// unloaded) once no connection holds it.
    Loaded(SharedDriver),
}

struct SharedDriver {
    connect: backend::ConnectFunction,
    // keeps the image mapped for as long as `connect` may be called
    _library: SharedObject,
}

impl Driver {
    /// Wrap a backend driver that may be collected once unused.
    pub fn new(backend: Box<dyn backend::Driver>) -> Arc<Self> {
        Arc::new(Driver {
            name: backend.name().to_owned(),
            kind: DriverKind::Installed(backend),
        })
    }

    /// Wrap a statically linked backend driver; never collected.
    pub fn new_static(backend: Box<dyn backend::Driver>) -> Arc<Self> {
        Arc::new(Driver {
            name: backend.name().to_owned(),
            kind: DriverKind::Static(backend),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a backend connection.
    pub fn open(&self, info: &ConnectionInfo) -> Result<Box<dyn backend::Connection>> {
        match &self.kind {
            DriverKind::Static(driver) | DriverKind::Installed(driver) => driver.open(info),
            DriverKind::Loaded(shared) => shared.open(&self.name, info),
        }
    }

    /// `true` while the registry must keep this driver.
    fn in_use(self: &Arc<Self>) -> bool {
        match self.kind {
            DriverKind::Static(_) => true,
            // one count is the registry's own; the rest are connections
            _ => Arc::strong_count(self) > 1,
        }
    }
}

impl SharedDriver {
    fn open(&self, name: &str, info: &ConnectionInfo) -> Result<Box<dyn backend::Connection>> {
        // SAFETY: `connect` was resolved from `_library`, which stays
        // mapped while `self` is alive, and the module was built against
        // this `ConnectionInfo` definition per the driver module contract.
        let raw = unsafe { (self.connect)(info as *const ConnectionInfo) };
        if raw.is_null() {
            return Err(Error::Database(
                format!("driver module `{name}` failed to open a connection").into(),
            ));
        }
        // SAFETY: a non-null return is a `Box<BoxedConnection>` the module
        // created with `Box::into_raw`, handing ownership to us.
        Ok(*unsafe { Box::from_raw(raw) })
    }
}

/// Registry of driver name → loaded driver; loads dynamic driver modules
/// lazily on the first connection request.
///
/// Construct one per process (or per test) and share it behind an `Arc`;
/// there is no global instance.
pub struct DriverManager {
    registry: Mutex<Registry>,
}

struct Registry {
    drivers: HashMap<String, Arc<Driver>>,
    search_paths: Vec<PathBuf>,
    use_default_path: bool,
}

impl Default for DriverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverManager {
    pub fn new() -> Self {
        DriverManager {
            registry: Mutex::new(Registry {
                drivers: HashMap::new(),
                search_paths: Vec::new(),
                use_default_path: true,
            }),
        }
    }

    /// Open a backend connection for `info`, loading its driver on first
    /// use.
    ///
    /// The connection is owned outright; it does not belong to any pool.
    pub fn connect(&self, info: &ConnectionInfo) -> Result<Connection> {
        Ok(Connection::new(self.connect_live(info)?, None))
    }

    pub(crate) fn connect_live(&self, info: &ConnectionInfo) -> Result<Live> {
        let driver = {
            let mut registry = self.registry.lock();
            match registry.drivers.get(info.driver()) {
                Some(driver) => Arc::clone(driver),
                None => {
                    let driver = registry.load(info)?;
                    registry
                        .drivers
                        .insert(info.driver().to_owned(), Arc::clone(&driver));
                    driver
                }
            }
        };
        // driver code runs unlocked; it may block on network I/O
        let backend = driver.open(info)?;
        Live::new(backend, info, Some(driver))
    }

    /// Register a driver explicitly, bypassing dynamic loading.
    ///
    /// Replaces any driver previously registered under `name`.
    pub fn install_driver(&self, name: &str, driver: Arc<Driver>) {
        self.registry.lock().drivers.insert(name.to_owned(), driver);
    }

    /// Whether a driver is currently registered under `name`.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.registry.lock().drivers.contains_key(name)
    }

    /// Remove every registered driver without open connections.
    pub fn collect_unused(&self) {
        let mut garbage = Vec::new();
        {
            let mut registry = self.registry.lock();
            registry.drivers.retain(|name, driver| {
                if driver.in_use() {
                    true
                } else {
                    tracing::debug!(target: "cppdb::driver", driver = %name, "collecting unused driver");
                    garbage.push(Arc::clone(driver));
                    false
                }
            });
        }
        // library unloads happen outside the lock
        drop(garbage);
    }

    /// Add a directory to search for driver modules.
    pub fn add_search_path(&self, path: impl Into<PathBuf>) {
        self.registry.lock().search_paths.push(path.into());
    }

    pub fn clear_search_paths(&self) {
        self.registry.lock().search_paths.clear();
    }

    /// Whether bare module names are also tried, deferring to the
    /// platform loader's own search path. Enabled by default.
    pub fn use_default_search_path(&self, value: bool) {
        self.registry.lock().use_default_path = value;
    }
}

impl Registry {
    fn load(&self, info: &ConnectionInfo) -> Result<Arc<Driver>> {
        let name = info.driver();
        let symbol = format!("cppdb_{name}_get_connection");

        for candidate in self.module_candidates(info) {
            let Some(library) = SharedObject::open(&candidate) else {
                continue;
            };
            // SAFETY: the driver module contract fixes the type of the
            // factory symbol.
            let connect = unsafe { library.resolve::<backend::ConnectFunction>(&symbol) }
                .map_err(|message| Error::driver_load(name, message))?;

            tracing::debug!(
                target: "cppdb::driver",
                driver = %name,
                module = %candidate.display(),
                "loaded driver module"
            );
            return Ok(Arc::new(Driver {
                name: name.to_owned(),
                kind: DriverKind::Loaded(SharedDriver {
                    connect,
                    _library: library,
                }),
            }));
        }

        Err(Error::driver_load(name, "no module found"))
    }

    fn module_candidates(&self, info: &ConnectionInfo) -> Vec<PathBuf> {
        if let Some(module) = info.get(KEY_MODULE) {
            return vec![PathBuf::from(module)];
        }

        let base_v1 = format!(
            "{}cppdb_{}{}",
            platform::PREFIX,
            info.driver(),
            platform::SUFFIX_V1
        );
        let base_v2 = format!(
            "{}cppdb_{}{}",
            platform::PREFIX,
            info.driver(),
            platform::SUFFIX_V2
        );

        let mut candidates = Vec::new();
        for path in &self.search_paths {
            candidates.push(path.join(&base_v1));
            candidates.push(path.join(&base_v2));
        }
        if self.use_default_path {
            // bare names defer to the platform loader's search path
            candidates.push(PathBuf::from(&base_v1));
            candidates.push(PathBuf::from(base_v2));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(paths: &[&str], use_default: bool) -> Registry {
        Registry {
            drivers: HashMap::new(),
            search_paths: paths.iter().map(PathBuf::from).collect(),
            use_default_path: use_default,
        }
    }

    #[test]
    fn explicit_module_property_bypasses_discovery() {
        let info: ConnectionInfo = "mysql:cppdb_module=/opt/drv/custom.so".parse().unwrap();
        let reg = registry(&["/usr/lib"], true);

        assert_eq!(
            reg.module_candidates(&info),
            vec![PathBuf::from("/opt/drv/custom.so")]
        );
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn candidates_cover_search_paths_then_default() {
        let info: ConnectionInfo = "mysql:".parse().unwrap();
        let reg = registry(&["/a", "/b"], true);

        assert_eq!(
            reg.module_candidates(&info),
            vec![
                PathBuf::from("/a/libcppdb_mysql.so"),
                PathBuf::from("/a/libcppdb_mysql.so.0"),
                PathBuf::from("/b/libcppdb_mysql.so"),
                PathBuf::from("/b/libcppdb_mysql.so.0"),
                PathBuf::from("libcppdb_mysql.so"),
                PathBuf::from("libcppdb_mysql.so.0"),
            ]
        );
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn default_path_can_be_disabled() {
        let info: ConnectionInfo = "mysql:".parse().unwrap();
        let reg = registry(&["/a"], false);

        assert_eq!(
            reg.module_candidates(&info),
            vec![
                PathBuf::from("/a/libcppdb_mysql.so"),
                PathBuf::from("/a/libcppdb_mysql.so.0"),
            ]
        );
    }

    #[test]
    fn missing_module_is_a_driver_load_error() {
        let info: ConnectionInfo = "no_such_engine:".parse().unwrap();
        let manager = DriverManager::new();
        manager.use_default_search_path(false);

        assert!(matches!(
            manager.connect(&info),
            Err(Error::DriverLoad { driver, .. }) if driver == "no_such_engine"
        ));
        assert!(!manager.is_loaded("no_such_engine"));
    }
}
