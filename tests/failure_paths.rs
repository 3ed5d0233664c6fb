//! Failure handling: storage faults, undecodable documents, aborted streams

use blogd::engine::{
    Backend, Collection, MemBackend, ObjectId, ScanIter, StoreError, StoreResult,
};
use blogd::proto::blog_service_server::BlogService;
use blogd::proto::*;
use blogd::service::{BlogGrpcService, BlogRepository};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tonic::{Code, Request};

/// Memory backend with switchable faults and a call counter.
#[derive(Default)]
struct FaultyBackend {
    inner: MemBackend,
    calls: AtomicUsize,
    fail_insert: AtomicBool,
    fail_replace: AtomicBool,
    fail_scan_open: AtomicBool,
    fail_scan_at_end: AtomicBool,
    remove_after_get: AtomicBool,
}

impl FaultyBackend {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Backend for FaultyBackend {
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        self.touch();
        let doc = self.inner.get(id)?;
        // Another caller deletes the document right after this read.
        if self.remove_after_get.load(Ordering::SeqCst) {
            self.inner.remove(id)?;
        }
        Ok(doc)
    }

    fn insert(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool> {
        self.touch();
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("insert refused".into()));
        }
        self.inner.insert(id, doc)
    }

    fn replace(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool> {
        self.touch();
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("replace refused".into()));
        }
        self.inner.replace(id, doc)
    }

    fn remove(&self, id: &ObjectId) -> StoreResult<bool> {
        self.touch();
        self.inner.remove(id)
    }

    fn scan(&self) -> StoreResult<ScanIter> {
        self.touch();
        if self.fail_scan_open.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("scan refused".into()));
        }
        let docs = self.inner.scan()?;
        if self.fail_scan_at_end.load(Ordering::SeqCst) {
            let tail = std::iter::once(Err(StoreError::Backend("cursor lost".into())));
            return Ok(Box::new(docs.chain(tail)));
        }
        Ok(docs)
    }

    fn len(&self) -> StoreResult<usize> {
        self.touch();
        self.inner.len()
    }
}

fn setup() -> (Arc<FaultyBackend>, Collection, BlogGrpcService) {
    let backend = Arc::new(FaultyBackend::default());
    let collection = Collection::with_backend("mydb.blog", backend.clone());
    let service = BlogGrpcService::new(BlogRepository::new(collection.clone()));
    (backend, collection, service)
}

fn blog(id: &str, title: &str) -> Blog {
    Blog {
        id: id.to_string(),
        author_id: "author".to_string(),
        title: title.to_string(),
        content: "content".to_string(),
    }
}

async fn create(service: &BlogGrpcService, title: &str) -> Result<Blog, tonic::Status> {
    service
        .create_blog(Request::new(CreateBlogRequest {
            blog: Some(blog("", title)),
        }))
        .await
        .map(|res| res.into_inner().blog.unwrap())
}

async fn collect_list(service: &BlogGrpcService) -> Vec<Result<ListBlogResponse, tonic::Status>> {
    service
        .list_blog(Request::new(ListBlogRequest {}))
        .await
        .unwrap()
        .into_inner()
        .collect()
        .await
}

async fn wait_for_no_cursors(collection: &Collection) {
    for _ in 0..200 {
        if collection.open_cursors() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cursor still open: {:?}", collection);
}

#[tokio::test]
async fn test_malformed_ids_never_reach_storage() {
    let (backend, _, service) = setup();
    let before = backend.calls();

    for bad in ["", "xyz", "gggggggggggggggggggggggg", "0123456789abcdef0123456"] {
        let status = service
            .read_blog(Request::new(ReadBlogRequest {
                blog_id: bad.into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        let status = service
            .update_blog(Request::new(UpdateBlogRequest {
                blog: Some(blog(bad, "t")),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        let status = service
            .delete_blog(Request::new(DeleteBlogRequest {
                blog_id: bad.into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    assert_eq!(backend.calls(), before);
}

#[tokio::test]
async fn test_insert_failure_is_internal() {
    let (backend, collection, service) = setup();
    backend.fail_insert.store(true, Ordering::SeqCst);

    let status = create(&service, "t").await.unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("insert refused"));
    assert_eq!(collection.count_documents().await.unwrap(), 0);
}

#[tokio::test]
async fn test_replace_failure_is_internal() {
    let (backend, _, service) = setup();
    let created = create(&service, "original").await.unwrap();
    backend.fail_replace.store(true, Ordering::SeqCst);

    let status = service
        .update_blog(Request::new(UpdateBlogRequest {
            blog: Some(blog(&created.id, "changed")),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);

    backend.fail_replace.store(false, Ordering::SeqCst);
    let fetched = service
        .read_blog(Request::new(ReadBlogRequest {
            blog_id: created.id.clone(),
        }))
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(fetched.title, "original");
}

#[tokio::test]
async fn test_undecodable_record_read_is_internal() {
    let (_, collection, service) = setup();
    let id = ObjectId::from_bytes([5; 12]);
    collection
        .insert_one(&json!({ "_id": id, "title": ["not", "a", "string"] }))
        .await
        .unwrap();

    let status = service
        .read_blog(Request::new(ReadBlogRequest {
            blog_id: id.to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
}

#[tokio::test]
async fn test_scan_open_failure() {
    let (backend, collection, service) = setup();
    backend.fail_scan_open.store(true, Ordering::SeqCst);

    let status = service
        .list_blog(Request::new(ListBlogRequest {}))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(collection.open_cursors(), 0);
}

#[tokio::test]
async fn test_iteration_error_after_last_record() {
    let (backend, collection, service) = setup();
    for i in 0..3 {
        create(&service, &format!("post {}", i)).await.unwrap();
    }
    backend.fail_scan_at_end.store(true, Ordering::SeqCst);

    let items = collect_list(&service).await;
    assert_eq!(items.len(), 4);
    assert!(items[..3].iter().all(|i| i.is_ok()));
    assert_eq!(items[3].as_ref().unwrap_err().code(), Code::Internal);
    wait_for_no_cursors(&collection).await;
}

#[tokio::test]
async fn test_decode_failure_mid_stream() {
    let (_, collection, service) = setup();
    for n in [1u8, 2] {
        let id = ObjectId::from_bytes([n; 12]);
        collection
            .insert_one(&json!({ "_id": id, "author_id": "a", "title": "t", "content": "c" }))
            .await
            .unwrap();
    }
    let broken = ObjectId::from_bytes([9; 12]);
    collection
        .insert_one(&json!({ "_id": broken, "author_id": "a" }))
        .await
        .unwrap();

    let items = collect_list(&service).await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().blog.as_ref().unwrap().id, "010101010101010101010101");
    assert_eq!(items[1].as_ref().unwrap().blog.as_ref().unwrap().id, "020202020202020202020202");
    assert_eq!(items[2].as_ref().unwrap_err().code(), Code::Internal);
    wait_for_no_cursors(&collection).await;
}

#[tokio::test]
async fn test_caller_abandons_stream() {
    let (_, collection, service) = setup();
    for i in 0..100 {
        create(&service, &format!("post {}", i)).await.unwrap();
    }
    let service = service.with_stream_buffer(1);

    let mut stream = service
        .list_blog(Request::new(ListBlogRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert!(stream.next().await.unwrap().is_ok());
    assert_eq!(collection.open_cursors(), 1);

    drop(stream);
    wait_for_no_cursors(&collection).await;
}

#[tokio::test]
async fn test_update_after_delete() {
    let (_, _, service) = setup();
    let created = create(&service, "t").await.unwrap();

    service
        .delete_blog(Request::new(DeleteBlogRequest {
            blog_id: created.id.clone(),
        }))
        .await
        .unwrap();

    let status = service
        .update_blog(Request::new(UpdateBlogRequest {
            blog: Some(blog(&created.id, "late")),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_update_when_record_vanishes_before_replace() {
    let (backend, collection, service) = setup();
    let created = create(&service, "t").await.unwrap();

    backend.remove_after_get.store(true, Ordering::SeqCst);
    let status = service
        .update_blog(Request::new(UpdateBlogRequest {
            blog: Some(blog(&created.id, "late")),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert!(status.message().contains(&created.id));

    // The update did not resurrect the record.
    backend.remove_after_get.store(false, Ordering::SeqCst);
    assert_eq!(collection.count_documents().await.unwrap(), 0);
}
