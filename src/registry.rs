use crate::error::{Result, StoreError};
use crate::file_store::{MmapedDict, PathAllocator, page_size};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Environment variable naming the shared `.db` directory, compatible
/// with the other Prometheus multiprocess clients.
pub const MULTIPROC_DIR_ENV: &str = "prometheus_multiproc_dir";

/// A callable producing the current process's pid token. The token shows
/// up in filenames and, for `all`-mode gauges, as the `pid` label.
pub type PidProvider = Box<dyn Fn() -> String + Send + Sync>;

/// Process-wide configuration for the multiprocess store.
pub struct Settings {
    /// Directory the per-process `.db` files live in.
    pub files_dir: PathBuf,
    /// Starting file size in bytes; rounded up to a whole page.
    pub initial_mmap_file_size: usize,
    /// Pid token source. Defaults to the OS pid.
    pub pid_provider: PidProvider,
}

impl Settings {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
            initial_mmap_file_size: page_size(),
            pid_provider: Box::new(|| std::process::id().to_string()),
        }
    }

    /// Reads the directory from `prometheus_multiproc_dir`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(MULTIPROC_DIR_ENV).map(Settings::new)
    }

    /// Reads the directory from the environment, falling back to a
    /// process-unique temporary directory (created if missing).
    pub fn from_env_or_default() -> Result<Self> {
        match Self::from_env() {
            Some(settings) => Ok(settings),
            None => {
                let dir = std::env::temp_dir()
                    .join(format!("multiproc_metrics_{}", std::process::id()));
                std::fs::create_dir_all(&dir)?;
                Ok(Settings::new(dir))
            }
        }
    }

    pub fn with_initial_file_size(mut self, bytes: usize) -> Self {
        self.initial_mmap_file_size = bytes;
        self
    }

    pub fn with_pid_provider(
        mut self,
        provider: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.pid_provider = Box::new(provider);
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("files_dir", &self.files_dir)
            .field("initial_mmap_file_size", &self.initial_mmap_file_size)
            .finish_non_exhaustive()
    }
}

/// Process-wide map from file prefix (`counter`, `gauge_max`, …) to the
/// dict file this process currently appends to.
///
/// Forks are detected by comparing the pid token on every access: a
/// changed pid closes every inherited dict and lets the next write
/// allocate fresh files under the new pid, so parent and child never
/// append to the same file.
pub struct FileRegistry {
    settings: Settings,
    allocator: PathAllocator,
    dicts: HashMap<String, MmapedDict>,
    last_seen_pid: String,
}

impl FileRegistry {
    pub fn new(settings: Settings) -> Self {
        let allocator = PathAllocator::new(settings.files_dir.clone());
        let last_seen_pid = (settings.pid_provider)();
        Self {
            settings,
            allocator,
            dicts: HashMap::new(),
            last_seen_pid,
        }
    }

    /// The dict for `prefix`, allocating and locking a fresh
    /// `<prefix>_<pid>-<n>.db` on first use.
    pub fn dict_for(&mut self, prefix: &str) -> Result<&mut MmapedDict> {
        match self.dicts.entry(prefix.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => {
                let path = self.allocator.acquire(prefix, &self.last_seen_pid)?;
                let dict = MmapedDict::open(&path, self.settings.initial_mmap_file_size)?;
                Ok(slot.insert(dict))
            }
        }
    }

    /// No-op unless the pid token changed since the last call (i.e. this
    /// process is a fork); then closes all inherited dicts so the next
    /// write reallocates under the new pid.
    pub fn reinitialize_on_pid_change(&mut self) {
        let pid = (self.settings.pid_provider)();
        if pid != self.last_seen_pid {
            debug!(
                "pid changed from {} to {}; reopening dict files",
                self.last_seen_pid, pid
            );
            self.close_all();
            self.last_seen_pid = pid;
        }
    }

    /// Unconditionally closes and forgets every dict. Test suites use this
    /// to return to a pristine state.
    pub fn reset_and_reinitialize(&mut self) {
        self.close_all();
        self.last_seen_pid = (self.settings.pid_provider)();
    }

    /// Flushes every open dict to disk.
    pub fn sync_all(&self) {
        for dict in self.dicts.values() {
            dict.sync();
        }
    }

    pub fn files_dir(&self) -> &PathBuf {
        &self.settings.files_dir
    }

    fn close_all(&mut self) {
        for (_, dict) in self.dicts.drain() {
            dict.sync();
            self.allocator.release(dict.path());
        }
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}

fn global() -> &'static Mutex<Option<FileRegistry>> {
    static GLOBAL: OnceLock<Mutex<Option<FileRegistry>>> = OnceLock::new();
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// Installs the process-wide settings, replacing any previous registry.
/// Must be called before metrics can record in multiprocess mode.
pub fn configure(settings: Settings) {
    let mut guard = global().lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(FileRegistry::new(settings));
}

/// Whether `configure` has been called in this process.
pub fn is_configured() -> bool {
    global()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .is_some()
}

/// Runs `f` against the dict for `prefix`, after the fork check. This is
/// the single mutex every writer thread serializes on.
pub fn with_dict<T>(prefix: &str, f: impl FnOnce(&mut MmapedDict) -> Result<T>) -> Result<T> {
    let mut guard = global().lock().unwrap_or_else(|e| e.into_inner());
    let registry = guard.as_mut().ok_or(StoreError::NotConfigured)?;
    registry.reinitialize_on_pid_change();
    f(registry.dict_for(prefix)?)
}

/// Flushes every dict this process has open. Exporters typically call
/// this before reading the directory on the same host.
pub fn sync_all() {
    let guard = global().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(registry) = guard.as_ref() {
        registry.sync_all();
    }
}

/// Closes every dict and reopens lazily under the current pid. Intended
/// for test suites.
pub fn reset_and_reinitialize() {
    let mut guard = global().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(registry) = guard.as_mut() {
        registry.reset_and_reinitialize();
    }
}

/// Tears the registry down entirely, releasing all path locks. The next
/// writer must `configure` again. Intended for test suites.
pub fn deconfigure() {
    let mut guard = global().lock().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}
