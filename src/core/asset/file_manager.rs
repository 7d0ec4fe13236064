//=========================================================================
// File Asset Manager
//=========================================================================
//
// Background file loader implementing the `AssetManager` seam.
//
// Architecture:
// ```text
//  Frame Thread:                       Loader Threads (N):
//  ┌──────────────────────────┐       ┌────────────────────────┐
//  │ load(descriptor)         │       │ recv LoadRequest       │
//  │  └─ LoadRequest ─────────┼──────>│ fs::read(path)         │
//  │                          │       │ loader(bytes)          │
//  │ update()                 │       │  └─ LoadResult ──┐     │
//  │  └─ try_recv results <───┼───────┼──────────────────┘     │
//  └──────────────────────────┘       └────────────────────────┘
// ```
//
// The frame thread never blocks: `update()` only drains whatever has
// completed. Requests carry a generation number so a completion for a
// file that was unloaded (and possibly reloaded) in the meantime is
// dropped instead of resurrecting stale data.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::{AssetDescriptor, AssetManager};

//=== Loader Types ========================================================

type LoadedAsset = Box<dyn Any + Send>;
type LoaderFn = dyn Fn(Vec<u8>) -> Result<LoadedAsset, String> + Send + Sync;

struct LoadRequest {
    file_name: String,
    generation: u64,
    path: PathBuf,
    loader: Arc<LoaderFn>,
}

struct LoadResult {
    file_name: String,
    generation: u64,
    outcome: Result<LoadedAsset, String>,
}

//=== Slot ================================================================

enum SlotState {
    Pending,
    Ready(LoadedAsset),
    Failed(String),
}

struct Slot {
    state: SlotState,
    generation: u64,
    refs: usize,
}

//=== FileAssetManager ====================================================

/// Loads asset files from a root directory on a pool of worker threads.
///
/// Each asset type needs a loader that turns the file's bytes into a
/// value. `Vec<u8>` (raw bytes) and `String` (UTF-8 text) are built in;
/// register others with [`FileAssetManager::with_loader`].
///
/// Loads are reference counted per file name: a file is released only
/// when every `load` has been matched by an `unload`.
pub struct FileAssetManager {
    root: PathBuf,
    loaders: HashMap<TypeId, Arc<LoaderFn>>,
    slots: HashMap<String, Slot>,
    next_generation: u64,
    requests: Option<Sender<LoadRequest>>,
    results: Receiver<LoadResult>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl FileAssetManager {
    //--- Construction -----------------------------------------------------

    /// Creates a manager reading files relative to `root`, served by
    /// `threads` loader threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn new(root: impl AsRef<Path>, threads: usize) -> Self {
        assert!(threads > 0, "Loader thread count must be positive");

        let (request_tx, request_rx) = unbounded::<LoadRequest>();
        let (result_tx, result_rx) = unbounded::<LoadResult>();

        let workers = (0..threads)
            .map(|index| {
                let requests = request_rx.clone();
                let results = result_tx.clone();
                thread::Builder::new()
                    .name(format!("asset-loader-{}", index))
                    .spawn(move || Self::worker_loop(requests, results))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!(target: "stagehand::asset", "Failed to spawn loader thread: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        info!(
            target: "stagehand::asset",
            "File asset manager ready ({} loader threads, root {:?})",
            workers.len(),
            root.as_ref()
        );

        let manager = Self {
            root: root.as_ref().to_path_buf(),
            loaders: HashMap::new(),
            slots: HashMap::new(),
            next_generation: 0,
            requests: Some(request_tx),
            results: result_rx,
            workers,
        };

        manager
            .with_loader::<Vec<u8>, _>(|bytes| Ok(bytes))
            .with_loader::<String, _>(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
    }

    /// Registers how files loaded as `T` are decoded.
    ///
    /// The loader runs on a worker thread. Registering a second loader
    /// for the same type replaces the first.
    pub fn with_loader<T, F>(mut self, loader: F) -> Self
    where
        T: Any + Send,
        F: Fn(Vec<u8>) -> Result<T, String> + Send + Sync + 'static,
    {
        let erased: Arc<LoaderFn> =
            Arc::new(move |bytes| loader(bytes).map(|value| Box::new(value) as LoadedAsset));
        self.loaders.insert(TypeId::of::<T>(), erased);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files requested but not yet completed.
    pub fn pending(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s.state, SlotState::Pending))
            .count()
    }

    //--- Worker -----------------------------------------------------------

    fn worker_loop(requests: Receiver<LoadRequest>, results: Sender<LoadResult>) {
        for request in requests.iter() {
            trace!(target: "stagehand::asset", "Reading {:?}", request.path);

            let outcome = fs::read(&request.path)
                .map_err(|e| format!("{}: {}", request.path.display(), e))
                .and_then(|bytes| (request.loader)(bytes));

            let result = LoadResult {
                file_name: request.file_name,
                generation: request.generation,
                outcome,
            };

            if results.send(result).is_err() {
                break;
            }
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn complete(&mut self, result: LoadResult) {
        let Some(slot) = self.slots.get_mut(&result.file_name) else {
            trace!(target: "stagehand::asset", "Dropping completion of released {}", result.file_name);
            return;
        };

        if slot.generation != result.generation {
            trace!(target: "stagehand::asset", "Dropping stale completion of {}", result.file_name);
            return;
        }

        slot.state = match result.outcome {
            Ok(asset) => {
                debug!(target: "stagehand::asset", "Loaded {}", result.file_name);
                SlotState::Ready(asset)
            }
            Err(reason) => {
                error!(target: "stagehand::asset", "Failed to load {}: {}", result.file_name, reason);
                SlotState::Failed(reason)
            }
        };
    }
}

//=== AssetManager Implementation =========================================

impl AssetManager for FileAssetManager {
    fn load(&mut self, descriptor: &AssetDescriptor) {
        let file_name = descriptor.file_name();

        if let Some(slot) = self.slots.get_mut(file_name) {
            slot.refs += 1;
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let state = match (self.loaders.get(&descriptor.type_id()), &self.requests) {
            (Some(loader), Some(requests)) => {
                let request = LoadRequest {
                    file_name: file_name.to_string(),
                    generation,
                    path: self.root.join(file_name),
                    loader: Arc::clone(loader),
                };
                if requests.send(request).is_ok() {
                    SlotState::Pending
                } else {
                    SlotState::Failed("loader threads are gone".to_string())
                }
            }
            (None, _) => {
                warn!(
                    target: "stagehand::asset",
                    "No loader registered for {} ({})",
                    file_name,
                    descriptor.type_name()
                );
                SlotState::Failed(format!("no loader for {}", descriptor.type_name()))
            }
            (_, None) => SlotState::Failed("asset manager is disposed".to_string()),
        };

        self.slots.insert(
            file_name.to_string(),
            Slot { state, generation, refs: 1 },
        );
    }

    fn unload(&mut self, file_name: &str) {
        let Some(slot) = self.slots.get_mut(file_name) else {
            warn!(target: "stagehand::asset", "Unload of unknown asset {}", file_name);
            return;
        };

        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs == 0 {
            debug!(target: "stagehand::asset", "Released {}", file_name);
            self.slots.remove(file_name);
        }
    }

    fn is_loaded(&self, file_name: &str) -> bool {
        matches!(
            self.slots.get(file_name).map(|s| &s.state),
            Some(SlotState::Ready(_))
        )
    }

    fn get(&self, file_name: &str) -> Option<&dyn Any> {
        match self.slots.get(file_name).map(|s| &s.state) {
            Some(SlotState::Ready(asset)) => {
                let asset: &dyn Any = asset.as_ref();
                Some(asset)
            }
            _ => None,
        }
    }

    fn failure(&self, file_name: &str) -> Option<String> {
        match self.slots.get(file_name).map(|s| &s.state) {
            Some(SlotState::Failed(reason)) => Some(reason.clone()),
            _ => None,
        }
    }

    fn update(&mut self) -> bool {
        while let Ok(result) = self.results.try_recv() {
            self.complete(result);
        }
        self.pending() == 0
    }

    fn dispose(&mut self) {
        // Closing the request channel ends every worker loop
        self.requests = None;

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!(target: "stagehand::asset", "Loader thread panicked");
            }
        }

        self.slots.clear();
        info!(target: "stagehand::asset", "File asset manager disposed");
    }
}

impl Drop for FileAssetManager {
    fn drop(&mut self) {
        if self.requests.is_some() {
            self.dispose();
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
