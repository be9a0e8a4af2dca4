use tracing::debug;

use crate::error::ApiError;
use crate::remote::Named;

/// Read-through snapshot of one remote collection.
///
/// The snapshot is fetched lazily and dropped by [`DirectoryCache::invalidate`];
/// callers invalidate after every successful mutation of the collection so
/// the next read goes back to the server.
#[derive(Debug)]
pub struct DirectoryCache<T> {
    collection: &'static str,
    snapshot: Option<Vec<T>>,
}

impl<T: Named + Clone> DirectoryCache<T> {
    pub fn new(collection: &'static str) -> Self {
        Self { collection, snapshot: None }
    }

    /// Current snapshot, fetched first when absent or when `refresh` is set.
    pub fn list<F>(&mut self, refresh: bool, fetch: F) -> Result<&[T], ApiError>
    where
        F: FnOnce() -> Result<Vec<T>, ApiError>,
    {
        if refresh || self.snapshot.is_none() {
            debug!(collection = self.collection, "refreshing snapshot");
            match fetch() {
                Ok(items) => self.snapshot = Some(items),
                Err(e) => {
                    self.snapshot = None;
                    return Err(e);
                }
            }
        }
        Ok(self.snapshot.as_deref().unwrap_or_default())
    }

    /// Look `name` up in the snapshot, refreshing exactly once on a miss.
    pub fn find_by_name<F>(&mut self, name: &str, mut fetch: F) -> Result<Option<T>, ApiError>
    where
        F: FnMut() -> Result<Vec<T>, ApiError>,
    {
        let hit = self.list(false, &mut fetch)?.iter().find(|item| item.name() == name).cloned();
        if hit.is_some() {
            return Ok(hit);
        }
        debug!(collection = self.collection, name, "not in snapshot, refreshing");
        let hit = self.list(true, &mut fetch)?.iter().find(|item| item.name() == name).cloned();
        if hit.is_none() {
            debug!(collection = self.collection, name, "still absent after refresh");
        }
        Ok(hit)
    }

    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }
}
