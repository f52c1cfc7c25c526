use std::sync::{Arc, RwLock};

use fasih_vector::SemanticIndex;

use crate::retriever::HybridRetriever;

/// Process-wide handle to the current retriever.
///
/// Readers take a snapshot and keep searching it even while a rebuilt
/// retriever is swapped in; they never observe a half-built index.
pub struct SharedRetriever<S = SemanticIndex> {
    inner: RwLock<Arc<HybridRetriever<S>>>,
}

impl<S> SharedRetriever<S> {
    pub fn new(retriever: HybridRetriever<S>) -> Self {
        Self { inner: RwLock::new(Arc::new(retriever)) }
    }

    pub fn snapshot(&self) -> Arc<HybridRetriever<S>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a fully built retriever and return the previous one.
    pub fn replace(&self, retriever: HybridRetriever<S>) -> Arc<HybridRetriever<S>> {
        let next = Arc::new(retriever);
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
