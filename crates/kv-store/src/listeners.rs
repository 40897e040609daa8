use parking_lot::RwLock;

use crate::KvListener;

/// Registry of change listeners shared by the store backends. Listeners are
/// invoked after the mutation has been applied, outside any store lock.
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: RwLock<Vec<KvListener>>,
}

impl ListenerSet {
    pub(crate) fn register(&self, listener: KvListener) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn emit(&self, key: &str) {
        let snapshot: Vec<KvListener> = self.listeners.read().iter().cloned().collect();
        for listener in snapshot {
            listener(key);
        }
    }
}
