use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Subscribers<S> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<S>)>,
}

/// Owned state plus the views that re-render when it changes.
///
/// Every mutation hands the new snapshot to each subscriber after the state
/// lock is released, so a subscriber may read the store again.
pub struct Store<S> {
    state: Mutex<S>,
    subscribers: Mutex<Subscribers<S>>,
}

impl<S> Store<S>
where
    S: Clone,
{
    pub fn new(initial: S) -> Self {
        Self {
            state: Mutex::new(initial),
            subscribers: Mutex::new(Subscribers { next_id: 0, listeners: Vec::new() }),
        }
    }

    pub fn get(&self) -> S {
        lock(&self.state).clone()
    }

    /// Reads the state without cloning it.
    pub fn read<R>(&self, reader: impl FnOnce(&S) -> R) -> R {
        reader(&lock(&self.state))
    }

    pub fn update<R>(&self, mutate: impl FnOnce(&mut S) -> R) -> R {
        let (result, snapshot) = {
            let mut state = lock(&self.state);
            let result = mutate(&mut state);
            (result, state.clone())
        };
        self.publish(&snapshot);
        result
    }

    pub fn replace(&self, value: S) -> S {
        self.update(|state| std::mem::replace(state, value))
    }

    pub fn subscribe(&self, listener: impl Fn(&S) + Send + Sync + 'static) -> SubscriptionId {
        let mut subscribers = lock(&self.subscribers);
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.listeners.len();
        subscribers.listeners.retain(|(existing, _)| *existing != id);
        subscribers.listeners.len() != before
    }

    fn publish(&self, snapshot: &S) {
        let listeners: Vec<Listener<S>> =
            lock(&self.subscribers).listeners.iter().map(|(_, listener)| listener.clone()).collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl<S> Default for Store<S>
where
    S: Clone + Default,
{
    fn default() -> Self {
        Self::new(S::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
