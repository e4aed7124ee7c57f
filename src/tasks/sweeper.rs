//! Expiration Sweeper
//!
//! Background task that periodically removes expired entries from a store.

use std::hash::Hash;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::runtime::{self, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::cache::Store;

/// Where the sweep loop is running.
#[derive(Debug)]
enum Worker {
    /// Spawned on a caller-provided runtime
    Task(JoinHandle<()>),
    /// Dedicated thread driving its own current-thread runtime
    Thread(Option<thread::JoinHandle<()>>),
}

// == Sweeper ==
/// Handle to a running sweep loop.
///
/// Once per interval the loop calls [`Store::delete_expired`]. It ends when
/// [`Sweeper::stop`] is called or the handle is dropped, and cannot be
/// restarted afterwards.
#[derive(Debug)]
pub struct Sweeper {
    interval: Duration,
    stop: Option<oneshot::Sender<()>>,
    worker: Worker,
}

impl Sweeper {
    /// Starts sweeping `store` every `interval` on a dedicated
    /// `ttl-cache-sweeper` thread driving its own current-thread runtime.
    ///
    /// The loop does not depend on any runtime owned by the caller, so it
    /// keeps running until stopped. Fails with `InvalidInput` for a zero
    /// interval, or if the thread cannot be created.
    ///
    /// # Example
    /// ```ignore
    /// let store = Arc::new(Store::<String, u32>::new(Duration::from_secs(300)));
    /// let mut sweeper = Sweeper::start(store.clone(), Duration::from_secs(60))?;
    /// // Later, during shutdown:
    /// sweeper.stop();
    /// ```
    pub fn start<K, V>(store: Arc<Store<K, V>>, interval: Duration) -> io::Result<Self>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        check_interval(interval)?;
        let (stop, stopped) = oneshot::channel();

        let thread = thread::Builder::new()
            .name("ttl-cache-sweeper".to_string())
            .spawn(move || {
                let runtime = runtime::Builder::new_current_thread()
                    .enable_time()
                    .build();
                match runtime {
                    Ok(runtime) => runtime.block_on(run(store, interval, stopped)),
                    Err(err) => error!(%err, "cannot build sweeper runtime"),
                }
            })?;

        Ok(Self {
            interval,
            stop: Some(stop),
            worker: Worker::Thread(Some(thread)),
        })
    }

    /// Starts sweeping `store` every `interval` as a task on `runtime`.
    ///
    /// The loop lives only as long as `runtime`: if the runtime shuts down
    /// first the loop is cancelled, a warning is logged and
    /// [`Sweeper::is_finished`] turns true. Use [`Sweeper::start`] unless the
    /// runtime is known to outlive the sweeper. Fails with `InvalidInput`
    /// for a zero interval.
    pub fn start_on<K, V>(
        store: Arc<Store<K, V>>,
        interval: Duration,
        runtime: &Handle,
    ) -> io::Result<Self>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        check_interval(interval)?;
        let (stop, stopped) = oneshot::channel();
        let task = runtime.spawn(run(store, interval, stopped));

        Ok(Self {
            interval,
            stop: Some(stop),
            worker: Worker::Task(task),
        })
    }

    /// Period between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signals the loop to stop.
    ///
    /// A loop running on its own thread is joined before returning; a task
    /// on a shared runtime returns at its next poll. Returns false if the
    /// sweeper had already been stopped.
    pub fn stop(&mut self) -> bool {
        let Some(stop) = self.stop.take() else {
            return false;
        };
        // The loop may already be gone if its runtime shut down
        let _ = stop.send(());

        if let Worker::Thread(slot) = &mut self.worker {
            // Never join from the sweeper thread itself, e.g. from an eviction callback
            let current = thread::current().id();
            if let Some(handle) = slot.take_if(|handle| handle.thread().id() != current) {
                let _ = handle.join();
            }
        }
        true
    }

    /// Whether the loop has returned.
    pub fn is_finished(&self) -> bool {
        match &self.worker {
            Worker::Task(handle) => handle.is_finished(),
            Worker::Thread(thread) => thread.as_ref().map_or(true, |t| t.is_finished()),
        }
    }
}

impl Drop for Sweeper {
    /// Best-effort stop for a forgotten shutdown. Does not wait for the loop.
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

fn check_interval(interval: Duration) -> io::Result<()> {
    if interval.is_zero() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "sweep interval must be non-zero",
        ));
    }
    Ok(())
}

/// Logs when the loop is dropped without having been told to stop, which
/// happens when the runtime running it shuts down.
struct Running {
    stopped: bool,
}

impl Drop for Running {
    fn drop(&mut self) {
        if !self.stopped {
            warn!("expiration sweeper cancelled by runtime shutdown, expired entries will no longer be purged");
        }
    }
}

/// The sweep loop: one `delete_expired` per tick until told to stop.
async fn run<K, V>(store: Arc<Store<K, V>>, period: Duration, mut stopped: oneshot::Receiver<()>)
where
    K: Eq + Hash + Clone,
{
    // A period too long to schedule never ticks
    let Some(start) = Instant::now().checked_add(period) else {
        let _ = stopped.await;
        return;
    };

    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut running = Running { stopped: false };
    info!(?period, "starting expiration sweeper");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.delete_expired();
                if removed > 0 {
                    debug!(removed, "sweep removed expired entries");
                } else {
                    trace!("sweep found no expired entries");
                }
            }
            // Fires on an explicit stop and when the handle is dropped
            _ = &mut stopped => break,
        }
    }
    running.stopped = true;

    info!("expiration sweeper stopped");
}
