use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::UploadError;

use super::{CompletedPart, ObjectStore, ObjectSummary};

#[derive(Default)]
struct MultipartState {
    bucket: String,
    key: String,
    parts: HashMap<i32, Vec<u8>>,
    aborted: bool,
    completed: bool,
}

/// In-memory `ObjectStore` used by tests. Records every call it receives and
/// supports injecting a bounded number of failures for a given part number
/// so tests can reproduce "part 4 fails, retry the whole upload" scenarios
/// without touching the network.
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<MockStoreState>,
}

#[derive(Default)]
struct MockStoreState {
    objects: HashMap<(String, String), Vec<u8>>,
    multiparts: HashMap<String, MultipartState>,
    next_upload_id: u64,
    calls: Vec<String>,
    part_failures: HashMap<(String, i32), u32>,
    put_failures: HashMap<String, u32>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `upload_part` for `key`'s `part_number` `times` times before
    /// letting it succeed.
    pub fn fail_part(&self, key: &str, part_number: i32, times: u32) {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.part_failures.insert((key.to_string(), part_number), times);
    }

    /// Fail `put_object` for `key` `times` times before letting it succeed.
    pub fn fail_put(&self, key: &str, times: u32) {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.put_failures.insert(key.to_string(), times);
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().expect("mock store poisoned").calls.clone()
    }

    pub fn stored_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let s = self.inner.lock().expect("mock store poisoned");
        s.objects.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    pub fn active_multipart_count(&self) -> usize {
        let s = self.inner.lock().expect("mock store poisoned");
        s.multiparts.values().filter(|m| !m.aborted && !m.completed).count()
    }

    pub fn was_aborted(&self, upload_id: &str) -> bool {
        let s = self.inner.lock().expect("mock store poisoned");
        s.multiparts.get(upload_id).map(|m| m.aborted).unwrap_or(false)
    }
}

impl ObjectStore for MockStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), UploadError> {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.calls.push(format!("put_object {bucket}/{key}"));
        if let Some(remaining) = s.put_failures.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UploadError::Transport(format!("injected failure for {key}")));
            }
        }
        s.objects.insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    fn head_bucket(&self, _bucket: &str) -> Result<bool, UploadError> {
        Ok(true)
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, UploadError> {
        let s = self.inner.lock().expect("mock store poisoned");
        Ok(s.objects.get(&(bucket.to_string(), key.to_string())).map(|v| v.len() as u64))
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, UploadError> {
        let s = self.inner.lock().expect("mock store poisoned");
        let mut out: Vec<ObjectSummary> = s
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), v)| ObjectSummary { key: k.clone(), size_bytes: v.len() as u64 })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
    ) -> Result<String, UploadError> {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.next_upload_id += 1;
        let upload_id = format!("mock-upload-{}", s.next_upload_id);
        s.calls.push(format!("create_multipart {bucket}/{key} -> {upload_id}"));
        s.multiparts.insert(
            upload_id.clone(),
            MultipartState {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: HashMap::new(),
                aborted: false,
                completed: false,
            },
        );
        Ok(upload_id)
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, UploadError> {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.calls.push(format!("upload_part {bucket}/{key} part={part_number}"));
        if let Some(remaining) = s.part_failures.get_mut(&(key.to_string(), part_number)) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UploadError::Transport(format!(
                    "injected failure for part {part_number} of {key}"
                )));
            }
        }
        let state = s
            .multiparts
            .get_mut(upload_id)
            .ok_or_else(|| UploadError::MultipartProtocol(format!("unknown upload id {upload_id}")))?;
        if state.aborted {
            return Err(UploadError::MultipartProtocol(format!("upload {upload_id} already aborted")));
        }
        let etag = format!("etag-{upload_id}-{part_number}-{}", body.len());
        state.parts.insert(part_number, body);
        Ok(etag)
    }

    fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), UploadError> {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.calls.push(format!("complete_multipart {bucket}/{key}"));
        let mut assembled = Vec::new();
        {
            let state = s
                .multiparts
                .get_mut(upload_id)
                .ok_or_else(|| UploadError::MultipartProtocol(format!("unknown upload id {upload_id}")))?;
            if state.aborted {
                return Err(UploadError::MultipartProtocol(format!(
                    "cannot complete aborted upload {upload_id}"
                )));
            }
            if state.bucket != bucket || state.key != key {
                return Err(UploadError::MultipartProtocol("bucket/key mismatch".to_string()));
            }
            let mut sorted_parts = parts;
            sorted_parts.sort_by_key(|p| p.part_number);
            for part in &sorted_parts {
                let data = state.parts.get(&part.part_number).ok_or_else(|| {
                    UploadError::MultipartProtocol(format!("missing part {}", part.part_number))
                })?;
                let expected_etag = format!("etag-{upload_id}-{}-{}", part.part_number, data.len());
                if expected_etag != part.etag {
                    return Err(UploadError::MultipartProtocol(format!(
                        "etag mismatch for part {}",
                        part.part_number
                    )));
                }
                assembled.extend_from_slice(data);
            }
            state.completed = true;
        }
        s.objects.insert((bucket.to_string(), key.to_string()), assembled);
        Ok(())
    }

    fn abort_multipart(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<(), UploadError> {
        let mut s = self.inner.lock().expect("mock store poisoned");
        s.calls.push(format!("abort_multipart {upload_id}"));
        if let Some(state) = s.multiparts.get_mut(upload_id) {
            state.aborted = true;
        }
        Ok(())
    }
}
