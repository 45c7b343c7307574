/// A caller-owned cached value, recomputed only when its key changes.
///
/// Replaces process-wide memoization of loaded data: the owner decides the
/// key (e.g. site id plus file path and modification time) and the cache is
/// invalidated exactly when a different key is requested.
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    entry: Option<(K, V)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it with `init` on a miss.
    /// A failed `init` leaves the previous entry untouched.
    pub fn get_or_try_init<E>(
        &mut self,
        key: K,
        init: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<&V, E> {
        let entry = match self.entry.take() {
            Some((k, v)) if k == key => (k, v),
            previous => match init(&key) {
                Ok(v) => (key, v),
                Err(e) => {
                    self.entry = previous;
                    return Err(e);
                }
            },
        };
        Ok(&self.entry.insert(entry).1)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match &self.entry {
            Some((k, v)) if k == key => Some(v),
            _ => None,
        }
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
