//! The bulk loading task and its state machine

use crate::concurrent::cancellation::CancellationHandle;
use crate::core::error::BoxError;

/// Per-kind loading behavior supplied by collaborators: resolve one item, and
/// clean up when loading stops early.
pub trait ItemLoader<T>: Send {
    fn load_item(&mut self, item: &T) -> Result<(), BoxError>;

    /// Called exactly once when loading stops before completing all items,
    /// whether through cancellation or a failed item. Not-yet-loaded items must
    /// not be left in a "maybe will load later" state.
    fn handle_cancellation(&mut self);
}

/// Terminal states observable through a [`LoadingHandle`](crate::loading::LoadingHandle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Completed,
    Cancelled,
    Failed,
}

/// Result of running a task to its terminal state
#[derive(Debug)]
pub enum LoadOutcome {
    Completed,
    Cancelled,
    Failed(BoxError),
}

impl LoadOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            LoadOutcome::Completed => TaskState::Completed,
            LoadOutcome::Cancelled => TaskState::Cancelled,
            LoadOutcome::Failed(_) => TaskState::Failed,
        }
    }
}

/// An ordered batch of items to load with one loader.
///
/// Items may be appended while the task is pending; `run` consumes the task,
/// so appending to (or re-running) a started task does not typecheck. The
/// cancellation flag is shared with every handle cloned off before submission.
pub struct BulkLoadingTask<T, L> {
    items: Vec<T>,
    loader: L,
    cancellation: CancellationHandle,
}

impl<T, L: ItemLoader<T>> BulkLoadingTask<T, L> {
    pub fn new(loader: L) -> Self {
        Self {
            items: Vec::new(),
            loader,
            cancellation: CancellationHandle::new(),
        }
    }

    pub fn add_item(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn add_items(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.extend(items);
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Handle observing and controlling this task's cancellation flag
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Load all items in insertion order.
    ///
    /// The cancellation flag is checked before each item; once it is observed,
    /// `handle_cancellation` runs and the remaining items are skipped. A failed
    /// item likewise triggers `handle_cancellation` and surfaces the original
    /// error. Every path calls `handle_cancellation` at most once.
    pub fn run(mut self) -> LoadOutcome {
        tracing::debug!("loading {} items", self.items.len());

        for item in &self.items {
            if self.cancellation.is_cancelled() {
                self.loader.handle_cancellation();
                return LoadOutcome::Cancelled;
            }

            if let Err(error) = self.loader.load_item(item) {
                self.loader.handle_cancellation();
                return LoadOutcome::Failed(error);
            }
        }

        LoadOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::UserError;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct LoaderLog {
        loaded: Vec<String>,
        cancellations: usize,
    }

    struct RecordingLoader {
        log: Arc<Mutex<LoaderLog>>,
        fail_on: Option<&'static str>,
        cancel_during: Option<(&'static str, CancellationHandle)>,
    }

    impl RecordingLoader {
        fn new(log: &Arc<Mutex<LoaderLog>>) -> Self {
            Self {
                log: Arc::clone(log),
                fail_on: None,
                cancel_during: None,
            }
        }
    }

    impl ItemLoader<&'static str> for RecordingLoader {
        fn load_item(&mut self, item: &&'static str) -> Result<(), BoxError> {
            if let Some((trigger, handle)) = &self.cancel_during {
                if item == trigger {
                    // external cancel arrives while this item loads; the flag
                    // check happens before the next item
                    handle.cancel();
                }
            }
            if self.fail_on == Some(*item) {
                return Err(Box::new(UserError::new(format!("cannot load {item}"))));
            }
            self.log.lock().unwrap().loaded.push((*item).to_string());
            Ok(())
        }

        fn handle_cancellation(&mut self) {
            self.log.lock().unwrap().cancellations += 1;
        }
    }

    #[test]
    fn test_completes_in_insertion_order() {
        let log = Arc::new(Mutex::new(LoaderLog::default()));
        let mut task = BulkLoadingTask::new(RecordingLoader::new(&log));
        task.add_items(["a", "b", "c"]);
        assert_eq!(task.item_count(), 3);

        match task.run() {
            LoadOutcome::Completed => {}
            other => panic!("expected Completed, got {other:?}"),
        }
        let log = log.lock().unwrap();
        assert_eq!(log.loaded, ["a", "b", "c"]);
        assert_eq!(log.cancellations, 0);
    }

    #[test]
    fn test_cancellation_before_second_item() {
        let log = Arc::new(Mutex::new(LoaderLog::default()));
        let mut loader = RecordingLoader::new(&log);
        let mut task = BulkLoadingTask::new(RecordingLoader::new(&log));
        loader.cancel_during = Some(("a", task.cancellation_handle()));
        task.loader = loader;
        task.add_items(["a", "b", "c"]);

        let outcome = task.run();
        assert_eq!(outcome.state(), TaskState::Cancelled);

        let log = log.lock().unwrap();
        assert_eq!(log.loaded, ["a"]);
        assert_eq!(log.cancellations, 1);
    }

    #[test]
    fn test_cancelled_before_start_loads_nothing() {
        let log = Arc::new(Mutex::new(LoaderLog::default()));
        let mut task = BulkLoadingTask::new(RecordingLoader::new(&log));
        task.add_items(["a", "b"]);
        task.cancellation_handle().cancel();

        let outcome = task.run();
        assert_eq!(outcome.state(), TaskState::Cancelled);

        let log = log.lock().unwrap();
        assert!(log.loaded.is_empty());
        assert_eq!(log.cancellations, 1);
    }

    #[test]
    fn test_failure_cancels_remaining_items() {
        let log = Arc::new(Mutex::new(LoaderLog::default()));
        let mut loader = RecordingLoader::new(&log);
        loader.fail_on = Some("b");
        let mut task = BulkLoadingTask::new(loader);
        task.add_items(["a", "b", "c"]);

        match task.run() {
            LoadOutcome::Failed(error) => {
                assert_eq!(error.to_string(), "cannot load b");
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        let log = log.lock().unwrap();
        // "a" loaded, "b" attempted and failed, "c" never reached
        assert_eq!(log.loaded, ["a"]);
        assert_eq!(log.cancellations, 1);
    }
}
