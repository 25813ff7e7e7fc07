//! Preload Scheduler
//!
//! Warms pages adjacent to the one being read, off the caller's thread and
//! with a bounded number of loads in flight.
//!
//! A single dispatcher task consumes requests from an unbounded channel in
//! arrival order. Before starting a load it waits until the in-flight count
//! is below `max_concurrent_preloads`, then runs the load on the blocking
//! pool under `preload_timeout`. Loads live in the dispatcher's `JoinSet`, so
//! shutting the dispatcher down cancels them too. Requests still queued at
//! shutdown are discarded and settle their counts as they are dropped.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::cache::ResourceStores;
use crate::error::{CacheError, Result};
use crate::models::Page;
use crate::preload::{discover_targets, PreloadRequest};

// == Preload Scheduler ==
pub struct PreloadScheduler {
    shared: Arc<PreloadShared>,
    dispatcher: JoinHandle<()>,
    runtime: Handle,
}

struct PreloadShared {
    stores: Arc<ResourceStores>,
    sender: mpsc::UnboundedSender<Queued>,
    /// Loads currently running
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    /// Requests waiting for a slot
    queued: AtomicUsize,
    /// Discovery jobs plus queued and running requests
    outstanding: AtomicUsize,
    slot_freed: Notify,
    idle: Notify,
}

impl PreloadScheduler {
    /// Starts the dispatcher on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn start(stores: Arc<ResourceStores>) -> Self {
        Self::start_on(stores, Handle::current())
    }

    /// Starts the dispatcher on the given runtime.
    pub fn start_on(stores: Arc<ResourceStores>, runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(PreloadShared {
            stores,
            sender,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            slot_freed: Notify::new(),
            idle: Notify::new(),
        });
        let dispatcher = runtime.spawn(dispatch(shared.clone(), receiver));

        Self {
            shared,
            dispatcher,
            runtime,
        }
    }

    // == Preload Page ==
    /// Warms `page`'s own resources now, then discovers and queues its
    /// neighbours in the background. Returns without waiting for them.
    pub fn preload_page(&self, page: &Page) {
        let started = Instant::now();
        let stores = &self.shared.stores;
        let resolver = stores.resolver();

        stores.cache_page_record(page);
        if let Some(path) = page.image_path(resolver) {
            stores.cache_image(&path);
        }
        if let Some(path) = page.audio_path(resolver) {
            stores.cache_audio(&path);
        }
        if let Some(path) = page.text_path(resolver) {
            stores.cache_text(&path);
        }
        info!(
            page = %page.path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Current page resources loaded"
        );

        let work = WorkGuard::new(self.shared.clone());
        let page = page.clone();
        self.runtime.spawn_blocking(move || {
            let shared = work.shared();
            let requests = discover_targets(&page, shared.stores.resolver());
            debug!(page = %page.path.display(), targets = requests.len(), "Discovered preload targets");
            for request in requests {
                shared.enqueue(request);
            }
            drop(work);
        });
    }

    /// Queues a single request.
    pub fn enqueue(&self, request: PreloadRequest) {
        self.shared.enqueue(request);
    }

    // == Introspection ==
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of loads ever observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak_in_flight.load(Ordering::Acquire)
    }

    /// Requests waiting for a free slot.
    pub fn pending(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.shared.outstanding.load(Ordering::Acquire) == 0
    }

    /// Resolves once no discovery, queued or running preload work remains.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.shared.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.is_idle() {
                return;
            }
            idle.await;
        }
    }

    /// Stops the dispatcher, cancels running loads and discards queued ones.
    /// [`wait_idle`](Self::wait_idle) resolves once the cancellation settles.
    pub fn shutdown(&self) {
        self.dispatcher.abort();
    }
}

impl Drop for PreloadScheduler {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

impl PreloadShared {
    /// The request's unit of work is finished by its [`SlotGuard`], or by
    /// its [`Queued`] wrapper when it is never admitted.
    fn enqueue(self: &Arc<Self>, request: PreloadRequest) {
        debug!(path = %request.path.display(), priority = %request.priority, "Preload queued");
        let queued = Queued::new(self.clone(), request);

        if self.sender.send(queued).is_err() {
            warn!("Preload dispatcher stopped, request dropped");
        }
    }

    /// Waits until a load may start and claims its slot.
    async fn acquire_slot(self: &Arc<Self>) -> SlotGuard {
        loop {
            let freed = self.slot_freed.notified();
            tokio::pin!(freed);
            freed.as_mut().enable();

            let limit = self.stores.config().max_concurrent_preloads.max(1);
            let current = self.in_flight.load(Ordering::Acquire);
            if current < limit {
                if self
                    .in_flight
                    .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    self.peak_in_flight.fetch_max(current + 1, Ordering::AcqRel);
                    return SlotGuard(self.clone());
                }
                continue;
            }
            freed.await;
        }
    }

    fn release_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.slot_freed.notify_one();
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Runs one admitted request to completion, timeout or cancellation.
    async fn run(self: Arc<Self>, request: PreloadRequest, _slot: SlotGuard) {
        let timeout = self.stores.config().preload_timeout;
        let path = request.path.clone();

        let worker = self.clone();
        let load = tokio::task::spawn_blocking(move || worker.warm(&request));

        match tokio::time::timeout(timeout, load).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                warn!(path = %path.display(), error = %e, "Preload failed");
            }
            Ok(Err(e)) => {
                error!(path = %path.display(), error = %e, "Preload task aborted");
            }
            Err(_) => {
                warn!(
                    path = %path.display(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Preload timed out, releasing its slot"
                );
            }
        }
    }

    /// Loads the page record and, depending on priority, its image and text.
    fn warm(&self, request: &PreloadRequest) -> Result<()> {
        let resolver = self.stores.resolver();
        if !resolver.exists(&request.path) {
            return Err(CacheError::NotFound(request.path.display().to_string()));
        }

        let page = self.stores.cache_page(&request.path).ok_or_else(|| {
            CacheError::Decode(format!("page {} could not be loaded", request.path.display()))
        })?;

        if request.priority.warms_image() {
            if let Some(path) = page.image_path(resolver) {
                self.stores.cache_image(&path);
            }
        }
        if request.priority.warms_text() {
            if let Some(path) = page.text_path(resolver) {
                self.stores.cache_text(&path);
            }
        }

        info!(
            page = %file_name(&request.path),
            priority = %request.priority,
            "Preloaded page"
        );
        Ok(())
    }
}

/// Single consumer of the request channel.
async fn dispatch(shared: Arc<PreloadShared>, mut receiver: mpsc::UnboundedReceiver<Queued>) {
    let mut loads = JoinSet::new();

    while let Some(queued) = receiver.recv().await {
        let slot = shared.acquire_slot().await;
        loads.spawn(shared.clone().run(queued.admit(), slot));

        // Reap finished loads so the set does not grow
        while loads.try_join_next().is_some() {}
    }
}

/// One unit of outstanding work; finishing it may make the scheduler idle.
struct WorkGuard(Arc<PreloadShared>);

impl WorkGuard {
    fn new(shared: Arc<PreloadShared>) -> Self {
        shared.outstanding.fetch_add(1, Ordering::AcqRel);
        Self(shared)
    }

    fn shared(&self) -> &Arc<PreloadShared> {
        &self.0
    }
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}

/// A request waiting in the channel or for a slot. Dropping it before
/// admission settles its queued and outstanding counts.
struct Queued {
    shared: Arc<PreloadShared>,
    request: Option<PreloadRequest>,
}

impl Queued {
    fn new(shared: Arc<PreloadShared>, request: PreloadRequest) -> Self {
        shared.outstanding.fetch_add(1, Ordering::AcqRel);
        shared.queued.fetch_add(1, Ordering::AcqRel);
        Self {
            shared,
            request: Some(request),
        }
    }

    /// Hands the request to a load; its unit of work moves to the slot.
    fn admit(mut self) -> PreloadRequest {
        self.shared.queued.fetch_sub(1, Ordering::AcqRel);
        match self.request.take() {
            Some(request) => request,
            None => unreachable!("queued request admitted twice"),
        }
    }
}

impl Drop for Queued {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            self.shared.queued.fetch_sub(1, Ordering::AcqRel);
            self.shared.finish_one();
            debug!(path = %request.path.display(), "Queued preload discarded");
        }
    }
}

/// A claimed in-flight slot. Releasing it also completes the request's
/// unit of work, whether the load finished, failed, timed out or was
/// cancelled.
struct SlotGuard(Arc<PreloadShared>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.release_slot();
        self.0.finish_one();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
