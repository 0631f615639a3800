//! # Pool de Workers
//! src/server/pool.rs
//!
//! Executor con un número fijo de threads que consumen una cola FIFO
//! acotada. Cuando la cola está llena la tarea se rechaza; el servidor
//! reporta el rechazo y cierra esa conexión.

use super::dispatch::{Executor, Task};
use crate::error::ServerError;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

struct QueueState {
    tasks: VecDeque<Task>,
    shutdown: bool,
}

/// Cola compartida entre el pool y sus workers
struct TaskQueue {
    state: Mutex<QueueState>,

    /// Notifica a los workers cuando llega una tarea o el apagado
    condvar: Condvar,

    max_capacity: usize,
}

impl TaskQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, task: Task) -> Result<(), ServerError> {
        let mut state = self.lock();

        if state.shutdown {
            return Err(ServerError::rejected("worker pool is shut down"));
        }
        if state.tasks.len() >= self.max_capacity {
            return Err(ServerError::rejected(format!(
                "queue is full (max capacity: {})",
                self.max_capacity
            )));
        }

        state.tasks.push_back(task);
        self.condvar.notify_one();
        Ok(())
    }

    /// Bloquea hasta tener una tarea; `None` cuando hay apagado y la cola
    /// quedó vacía
    fn dequeue(&self) -> Option<Task> {
        let mut state = self.lock();

        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.shutdown {
                return None;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Pool de threads que implementa [`Executor`]
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Threads que llegaron a arrancar
    size: usize,
}

impl WorkerPool {
    /// Lanza `workers` threads con una cola de `capacity` tareas
    ///
    /// Un pool sin threads (`workers == 0`, o si ninguno pudo arrancar)
    /// rechaza todas las tareas en lugar de encolarlas.
    ///
    /// # Ejemplo
    /// ```
    /// use mini_http::server::{Executor, WorkerPool};
    ///
    /// let pool = WorkerPool::new(2, 16);
    /// pool.execute(Box::new(|| println!("hola desde un worker"))).unwrap();
    /// pool.shutdown();
    /// ```
    pub fn new(workers: usize, capacity: usize) -> Self {
        let queue = Arc::new(TaskQueue {
            state: Mutex::new(QueueState {
                tasks: VecDeque::with_capacity(capacity),
                shutdown: false,
            }),
            condvar: Condvar::new(),
            max_capacity: capacity,
        });

        let handles = (0..workers)
            .map(|id| {
                let queue = Arc::clone(&queue);
                thread::Builder::new()
                    .name(format!("http-worker-{}", id))
                    .spawn(move || Self::worker_loop(id, queue))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("failed to spawn worker thread: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        if handles.is_empty() {
            warn!("worker pool has no threads, every task will be rejected");
        }

        Self {
            queue,
            size: handles.len(),
            workers: Mutex::new(handles),
        }
    }

    fn worker_loop(id: usize, queue: Arc<TaskQueue>) {
        debug!(worker = id, "worker started");
        while let Some(task) = queue.dequeue() {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                warn!(worker = id, "task panicked");
            }
        }
        debug!(worker = id, "worker stopped");
    }

    /// Tareas esperando en la cola
    pub fn pending(&self) -> usize {
        self.queue.lock().tasks.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.max_capacity
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Deja de aceptar tareas, termina las encoladas y espera a los workers
    pub fn shutdown(&self) {
        self.queue.lock().shutdown = true;
        self.queue.condvar.notify_all();

        let handles: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) -> Result<(), ServerError> {
        if self.size == 0 {
            return Err(ServerError::rejected("worker pool has no threads"));
        }
        self.queue.enqueue(task)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_runs_all_tasks() {
        let pool = WorkerPool::new(3, 100);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let c = Arc::clone(&counter);
            pool.execute(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_tasks_run_off_caller_thread() {
        let pool = WorkerPool::new(1, 4);
        let (tx, rx) = mpsc::channel();

        pool.execute(Box::new(move || {
            let name = thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }))
        .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("http-worker-0"));
    }

    #[test]
    fn test_rejects_when_full() {
        let pool = WorkerPool::new(1, 1);
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        // Ocupa al único worker
        pool.execute(Box::new(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        }))
        .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Llena la cola
        pool.execute(Box::new(|| {})).unwrap();
        assert_eq!(pool.pending(), 1);

        let result = pool.execute(Box::new(|| {}));
        assert!(matches!(result, Err(ServerError::Rejected { .. })));

        release_tx.send(()).unwrap();
        pool.shutdown();
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_rejects_after_shutdown() {
        let pool = WorkerPool::new(2, 8);
        pool.shutdown();

        let result = pool.execute(Box::new(|| {}));
        assert!(matches!(result, Err(ServerError::Rejected { .. })));
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn test_pool_without_workers_rejects() {
        let pool = WorkerPool::new(0, 4);
        assert_eq!(pool.size(), 0);

        let result = pool.execute(Box::new(|| {}));
        assert!(matches!(result, Err(ServerError::Rejected { .. })));
        assert_eq!(pool.pending(), 0);
    }
}
