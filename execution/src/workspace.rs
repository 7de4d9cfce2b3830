use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use core_types::TensorDesc;
use opgraph_ops::{AnyElement, TensorAny};
use tensor::Tensor;

/// Named tensors shared by the operators of a net.
///
/// Reads and writes go through an `RwLock` so one workspace can be fed and
/// fetched from several threads. Blobs are reference-counted, so operators
/// read their inputs without holding the lock.
#[derive(Default)]
pub struct Workspace {
    blobs: RwLock<HashMap<String, Arc<TensorAny>>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a blob; returns the previous value
    pub fn feed_blob(&self, name: &str, value: impl Into<TensorAny>) -> Option<Arc<TensorAny>> {
        self.blobs.write().insert(name.to_string(), Arc::new(value.into()))
    }

    pub fn has_blob(&self, name: &str) -> bool {
        self.blobs.read().contains_key(name)
    }

    /// Copy of the blob
    pub fn fetch_blob(&self, name: &str) -> Option<TensorAny> {
        self.blobs.read().get(name).map(|b| TensorAny::clone(b))
    }

    /// Copy of the blob if it holds elements of type `T`
    pub fn fetch_tensor<T: AnyElement>(&self, name: &str) -> Option<Tensor<T>> {
        self.blobs.read().get(name).and_then(|b| b.downcast_ref::<T>()).cloned()
    }

    pub fn blob_desc(&self, name: &str) -> Option<TensorDesc> {
        self.blobs.read().get(name).map(|b| b.desc())
    }

    pub fn remove_blob(&self, name: &str) -> Option<Arc<TensorAny>> {
        self.blobs.write().remove(name)
    }

    /// Blob names, sorted
    pub fn blobs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Drop every blob
    pub fn reset(&self) {
        self.blobs.write().clear();
    }

    /// Shared handles to several blobs, taken under one read lock; the
    /// error is the first missing name
    pub(crate) fn handles(&self, names: &[String]) -> Result<Vec<Arc<TensorAny>>, String> {
        let guard = self.blobs.read();
        names
            .iter()
            .map(|n| guard.get(n).cloned().ok_or_else(|| n.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DataType;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn feed_fetch_and_reset() {
        let ws = Workspace::new();
        assert!(ws.is_empty());

        let t = Tensor::from_vec(vec![1i64, 2, 3], &[3]).unwrap();
        assert!(ws.feed_blob("b", t.clone()).is_none());
        ws.feed_blob("a", Tensor::<f32>::zeros(&[2, 2]).unwrap());

        assert!(ws.has_blob("b"));
        assert_eq!(ws.blobs(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ws.fetch_tensor::<i64>("b"), Some(t));
        assert_eq!(ws.fetch_tensor::<f32>("b"), None);
        assert_eq!(ws.blob_desc("a"), Some(TensorDesc::known(DataType::F32, &[2, 2])));

        let old = ws.feed_blob("b", Tensor::scalar(9i32)).unwrap();
        assert_eq!(old.dtype(), DataType::I64);
        assert_eq!(ws.fetch_blob("b").unwrap().dtype(), DataType::I32);

        assert!(ws.remove_blob("a").is_some());
        assert_eq!(ws.len(), 1);
        ws.reset();
        assert!(ws.is_empty());
        assert!(ws.fetch_blob("b").is_none());
    }

    #[test]
    fn handles_report_missing_name() {
        let ws = Workspace::new();
        ws.feed_blob("x", Tensor::scalar(1.0f64));

        let held = ws.handles(&["x".to_string()]).unwrap();
        assert_eq!(held.len(), 1);

        let missing = ws.handles(&["x".to_string(), "y".to_string()]);
        assert_eq!(missing.unwrap_err(), "y");
    }

    #[test]
    fn handles_do_not_block_writers() {
        let ws = Workspace::new();
        ws.feed_blob("x", Tensor::scalar(1i32));
        let held = ws.handles(&["x".to_string()]).unwrap();

        // replacing the blob while a handle is alive leaves the handle intact
        ws.feed_blob("x", Tensor::scalar(2i32));
        assert_eq!(held[0].downcast_ref::<i32>().unwrap().data(), &[1]);
        assert_eq!(ws.fetch_tensor::<i32>("x").unwrap().data(), &[2]);
    }

    #[test]
    fn shared_between_threads() {
        let ws = Arc::new(Workspace::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ws = Arc::clone(&ws);
                thread::spawn(move || {
                    ws.feed_blob(&format!("t{i}"), Tensor::scalar(i as i32));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ws.len(), 4);
        assert_eq!(ws.fetch_tensor::<i32>("t3").unwrap().data(), &[3]);
    }
}
