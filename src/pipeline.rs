// Closable push-streams
//
// A pipeline is an append-only graph of stages. Pushing an item walks the
// downstream feeders in registration order; close runs callbacks bottom-up,
// exactly once, and propagates both into the stage's subtree and toward the
// source, so closing any derived pipeline tears the whole subscription down.

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::mem;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

type Feeder<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Closer = Arc<dyn Fn() + Send + Sync>;

struct Stage<T> {
    state: AtomicU8,
    feeders: Mutex<Vec<Feeder<T>>>,
    child_closers: Mutex<Vec<Closer>>,
    close_hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    parent_closer: Mutex<Option<Closer>>,
}

pub struct Pipeline<T> {
    stage: Arc<Stage<T>>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            stage: Arc::clone(&self.stage),
        }
    }
}

impl<T: 'static> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Pipeline<T> {
    pub fn new() -> Self {
        Self {
            stage: Arc::new(Stage {
                state: AtomicU8::new(OPEN),
                feeders: Mutex::new(Vec::new()),
                child_closers: Mutex::new(Vec::new()),
                close_hooks: Mutex::new(Vec::new()),
                parent_closer: Mutex::new(None),
            }),
        }
    }

    /// Feed one item into this stage. Dropped silently once closing begins.
    pub fn push(&self, item: T) {
        if self.stage.state.load(Ordering::Acquire) != OPEN {
            return;
        }
        // Snapshot so feeders may close stages (including this one) mid-walk
        let feeders = self.stage.feeders.lock().clone();
        for feeder in &feeders {
            feeder(&item);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stage.state.load(Ordering::Acquire) != OPEN
    }

    /// Close this stage: closes the downstream subtree, runs the registered
    /// close callbacks bottom-up, then propagates toward the source.
    /// Idempotent and safe to call from inside a feeder.
    pub fn close(&self) {
        {
            let mut feeders = self.stage.feeders.lock();
            if self
                .stage
                .state
                .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            feeders.clear();
        }
        let children = mem::take(&mut *self.stage.child_closers.lock());
        for child in children {
            child();
        }
        let hooks = mem::take(&mut *self.stage.close_hooks.lock());
        for hook in hooks {
            hook();
        }
        self.stage.state.store(CLOSED, Ordering::Release);
        let parent = self.stage.parent_closer.lock().take();
        if let Some(parent) = parent {
            parent();
        }
    }

    /// Register a callback to run exactly once when this stage closes. If the
    /// stage is already closing, the callback runs immediately.
    pub fn on_close(&self, hook: impl FnOnce() + Send + 'static) {
        let run_now = {
            let mut hooks = self.stage.close_hooks.lock();
            if self.stage.state.load(Ordering::Acquire) == OPEN {
                hooks.push(Box::new(hook));
                return;
            }
            true
        };
        if run_now {
            hook();
        }
    }

    fn closer(&self) -> Closer {
        let this = self.clone();
        Arc::new(move || this.close())
    }

    fn attach_stage<U: 'static>(
        &self,
        transform: impl Fn(&T, &Pipeline<U>) + Send + Sync + 'static,
    ) -> Pipeline<U> {
        let child = Pipeline::<U>::new();
        *child.stage.parent_closer.lock() = Some(self.closer());
        let into_child = child.clone();
        let feeder: Feeder<T> = Arc::new(move |item| transform(item, &into_child));
        let mut feeders = self.stage.feeders.lock();
        if self.stage.state.load(Ordering::Acquire) != OPEN {
            drop(feeders);
            child.close();
            return child;
        }
        feeders.push(feeder);
        self.stage.child_closers.lock().push(child.closer());
        drop(feeders);
        child
    }

    /// Observe items without creating a derived stage.
    pub fn for_each(&self, observer: impl Fn(&T) + Send + Sync + 'static) {
        let mut feeders = self.stage.feeders.lock();
        if self.stage.state.load(Ordering::Acquire) == OPEN {
            feeders.push(Arc::new(observer));
        }
    }

    pub fn map<U: 'static>(&self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> Pipeline<U> {
        self.attach_stage(move |item, out| out.push(f(item)))
    }

    pub fn filter_map<U: 'static>(
        &self,
        f: impl Fn(&T) -> Option<U> + Send + Sync + 'static,
    ) -> Pipeline<U> {
        self.attach_stage(move |item, out| {
            if let Some(mapped) = f(item) {
                out.push(mapped);
            }
        })
    }
}

impl<T: Clone + 'static> Pipeline<T> {
    pub fn filter(&self, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Pipeline<T> {
        self.attach_stage(move |item, out| {
            if pred(item) {
                out.push(item.clone());
            }
        })
    }

    /// Forward items unchanged. Useful for attaching observers or close
    /// hooks without disturbing an existing stage.
    pub fn noop(&self) -> Pipeline<T> {
        self.attach_stage(|item, out| out.push(item.clone()))
    }

    /// Merge a foreign pipeline's teardown into this one: the returned stage
    /// forwards this pipeline's items, and closing it also closes `other`.
    /// `other`'s items are ignored.
    pub fn union_output<U: 'static>(&self, other: &Pipeline<U>) -> Pipeline<T> {
        let merged = self.noop();
        let other = other.clone();
        merged.on_close(move || other.close());
        merged
    }
}

impl<T: Clone + Send + 'static> Pipeline<T> {
    /// Blocking consumption adapter: items are forwarded into an unbounded
    /// channel. The sender is dropped when the pipeline closes, so receivers
    /// observe disconnection.
    pub fn channel(&self) -> Receiver<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.for_each(move |item| {
            let _ = tx.send(item.clone());
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_map_and_filter() {
        let source = Pipeline::<i32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        source
            .filter(|n| n % 2 == 0)
            .map(|n| n * 10)
            .for_each(move |n| sink.lock().push(*n));

        for n in 0..5 {
            source.push(n);
        }
        assert_eq!(*seen.lock(), vec![0, 20, 40]);
    }

    #[test]
    fn test_close_runs_hooks_exactly_once() {
        let pipeline = Pipeline::<()>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        pipeline.on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        pipeline.close();
        pipeline.close();
        pipeline.close();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_hooks_run_bottom_up() {
        let source = Pipeline::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let derived = source.noop();

        let log = order.clone();
        source.on_close(move || log.lock().push("source"));
        let log = order.clone();
        derived.on_close(move || log.lock().push("derived"));

        source.close();
        assert_eq!(*order.lock(), vec!["derived", "source"]);
    }

    #[test]
    fn test_closing_derived_stage_reaches_the_source() {
        let source = Pipeline::<i32>::new();
        let derived = source.map(|n| *n + 1);
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = closed.clone();
        source.on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        derived.close();
        assert!(source.is_closed());
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        // Pushes after close are dropped
        source.push(1);
    }

    #[test]
    fn test_union_output_closes_both() {
        let main = Pipeline::<i32>::new();
        let aux = Pipeline::<()>::new();
        let merged = main.union_output(&aux);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        merged.for_each(move |n| sink.lock().push(*n));

        main.push(7);
        merged.close();
        main.push(8);

        assert_eq!(*seen.lock(), vec![7]);
        assert!(aux.is_closed());
        assert!(main.is_closed());
    }

    #[test]
    fn test_close_from_inside_a_feeder() {
        let source = Pipeline::<i32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = source.noop();
        let closing = handle.clone();
        handle.for_each(move |n| {
            sink.lock().push(*n);
            closing.close();
        });

        source.push(1);
        source.push(2);
        assert_eq!(*seen.lock(), vec![1]);
        assert!(source.is_closed());
    }

    #[test]
    fn test_deriving_from_closed_pipeline_yields_closed_stage() {
        let source = Pipeline::<i32>::new();
        source.close();
        let derived = source.map(|n| *n);
        assert!(derived.is_closed());
    }

    #[test]
    fn test_channel_disconnects_on_close() {
        let source = Pipeline::<i32>::new();
        let rx = source.channel();

        source.push(3);
        source.close();

        assert_eq!(rx.recv().unwrap(), 3);
        assert!(rx.recv().is_err());
    }
}
