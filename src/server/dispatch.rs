//! # Estrategia de Despacho
//! src/server/dispatch.rs
//!
//! Cada conexión aceptada se atiende en el mismo thread del accept loop
//! (`Inline`, serializa todo) o se entrega a un executor externo
//! (`Executor`, paralelismo entre conexiones). Se elige al construir el
//! servidor.

use crate::error::ServerError;
use std::fmt;
use std::sync::Arc;

/// Trabajo a ejecutar: atender una conexión
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Colaborador que ejecuta tareas en otra línea de ejecución
pub trait Executor: Send + Sync {
    /// Acepta la tarea o la rechaza con `ServerError::Rejected`
    fn execute(&self, task: Task) -> Result<(), ServerError>;
}

/// Dónde se atiende cada conexión
#[derive(Clone, Default)]
pub enum Dispatch {
    /// En el thread del accept loop
    #[default]
    Inline,

    /// En el executor dado
    Executor(Arc<dyn Executor>),
}

impl Dispatch {
    pub fn executor<E: Executor + 'static>(executor: E) -> Self {
        Dispatch::Executor(Arc::new(executor))
    }

    /// Ejecuta `task` según la estrategia
    ///
    /// Inline nunca falla; un executor puede rechazar la tarea.
    pub fn run(&self, task: Task) -> Result<(), ServerError> {
        match self {
            Dispatch::Inline => {
                task();
                Ok(())
            }
            Dispatch::Executor(executor) => executor.execute(task),
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Inline => write!(f, "Inline"),
            Dispatch::Executor(_) => write!(f, "Executor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct Refusing;

    impl Executor for Refusing {
        fn execute(&self, _task: Task) -> Result<(), ServerError> {
            Err(ServerError::rejected("closed"))
        }
    }

    struct SpawnThread;

    impl Executor for SpawnThread {
        fn execute(&self, task: Task) -> Result<(), ServerError> {
            thread::spawn(task).join().map_err(|_| ServerError::rejected("panicked"))
        }
    }

    #[test]
    fn test_inline_runs_on_caller_thread() {
        let caller = thread::current().id();
        let ran_on = Arc::new(std::sync::Mutex::new(None));

        let slot = Arc::clone(&ran_on);
        Dispatch::Inline
            .run(Box::new(move || {
                *slot.lock().unwrap() = Some(thread::current().id());
            }))
            .unwrap();

        assert_eq!(*ran_on.lock().unwrap(), Some(caller));
    }

    #[test]
    fn test_executor_receives_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let dispatch = Dispatch::executor(SpawnThread);

        let c = Arc::clone(&counter);
        dispatch
            .run(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejection_is_returned() {
        let dispatch = Dispatch::executor(Refusing);
        let result = dispatch.run(Box::new(|| {}));

        assert!(matches!(result, Err(ServerError::Rejected { .. })));
    }

    #[test]
    fn test_default_is_inline() {
        assert!(matches!(Dispatch::default(), Dispatch::Inline));
    }
}
