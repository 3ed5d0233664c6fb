//! BlogService gRPC adapter
//!
//! Maps each RPC onto the identifier codec and the repository, and every
//! failure onto one of three status codes:
//! - `InvalidArgument`: malformed identifier
//! - `NotFound`: well-formed identifier with no record
//! - `Internal`: everything else

use crate::common::request_id::{request_id, rpc_span};
use crate::common::{Error, Result, METRICS};
use crate::proto::blog_service_server::{BlogService, BlogServiceServer};
use crate::proto::*;
use crate::service::codec;
use crate::service::model::BlogItem;
use crate::service::repository::BlogRepository;
use crate::service::stream::{self, ListBlogItem};
use std::future::Future;
use std::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::Instrument;

pub const DEFAULT_STREAM_BUFFER: usize = 16;

/// BlogGrpcService implements the public blog API.
#[derive(Clone, Debug)]
pub struct BlogGrpcService {
    repo: BlogRepository,
    stream_buffer: usize,
}

impl BlogGrpcService {
    pub fn new(repo: BlogRepository) -> Self {
        Self {
            repo,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    /// Converts this service into a gRPC server instance.
    pub fn into_server(self) -> BlogServiceServer<Self> {
        BlogServiceServer::new(self)
    }

    async fn create(&self, req: CreateBlogRequest) -> Result<CreateBlogResponse> {
        let item = BlogItem::from_proto(req.blog.unwrap_or_default());

        let inserted = self.repo.insert(&item).await?;
        let id = codec::from_inserted_id(&inserted)?;

        let stored = BlogItem {
            id: Some(id),
            ..item
        };
        tracing::debug!(id = %codec::encode(&id), "blog created");
        Ok(CreateBlogResponse {
            blog: Some(stored.to_proto()),
        })
    }

    async fn read(&self, req: ReadBlogRequest) -> Result<ReadBlogResponse> {
        let oid = codec::decode(&req.blog_id)?;

        let item = self
            .repo
            .find_by_id(&oid)
            .await?
            .ok_or_else(|| Error::NotFound(req.blog_id.clone()))?;

        Ok(ReadBlogResponse {
            blog: Some(item.to_proto()),
        })
    }

    /// Last write wins: no version check between the lookup and the replace.
    async fn update(&self, req: UpdateBlogRequest) -> Result<UpdateBlogResponse> {
        let blog = req.blog.unwrap_or_default();
        let oid = codec::decode(&blog.id)?;

        let mut item = self
            .repo
            .find_by_id(&oid)
            .await?
            .ok_or_else(|| Error::NotFound(blog.id.clone()))?;

        let requested_id = blog.id.clone();
        item.replace_fields(blog);

        // The record can vanish between lookup and replace.
        if !self.repo.replace(&oid, &item).await? {
            return Err(Error::NotFound(requested_id));
        }

        Ok(UpdateBlogResponse {
            blog: Some(item.to_proto()),
        })
    }

    async fn delete(&self, req: DeleteBlogRequest) -> Result<DeleteBlogResponse> {
        let oid = codec::decode(&req.blog_id)?;

        if self.repo.delete_by_id(&oid).await? == 0 {
            return Err(Error::NotFound(req.blog_id));
        }

        Ok(DeleteBlogResponse {
            blog_id: req.blog_id,
        })
    }

    async fn list(&self) -> Result<ReceiverStream<ListBlogItem>> {
        let cursor = self.repo.scan_all().await?;
        Ok(stream::spawn(cursor, self.stream_buffer))
    }
}

/// Run one RPC inside its span, recording latency and outcome.
async fn observe<T, F>(
    method: &'static str,
    request_id: String,
    call: F,
) -> std::result::Result<Response<T>, Status>
where
    F: Future<Output = Result<T>>,
{
    let span = rpc_span(method, &request_id);
    let start = Instant::now();

    let result = async {
        tracing::info!("received a {} rpc request", method);
        let result = call.await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{} failed", method);
        }
        result
    }
    .instrument(span)
    .await;

    METRICS.record_request(method, start.elapsed(), result.is_ok());
    result.map(Response::new).map_err(|e| e.to_grpc_status())
}

#[tonic::async_trait]
impl BlogService for BlogGrpcService {
    async fn create_blog(
        &self,
        req: Request<CreateBlogRequest>,
    ) -> std::result::Result<Response<CreateBlogResponse>, Status> {
        let id = request_id(&req);
        observe("CreateBlog", id, self.create(req.into_inner())).await
    }

    async fn read_blog(
        &self,
        req: Request<ReadBlogRequest>,
    ) -> std::result::Result<Response<ReadBlogResponse>, Status> {
        let id = request_id(&req);
        observe("ReadBlog", id, self.read(req.into_inner())).await
    }

    async fn update_blog(
        &self,
        req: Request<UpdateBlogRequest>,
    ) -> std::result::Result<Response<UpdateBlogResponse>, Status> {
        let id = request_id(&req);
        observe("UpdateBlog", id, self.update(req.into_inner())).await
    }

    async fn delete_blog(
        &self,
        req: Request<DeleteBlogRequest>,
    ) -> std::result::Result<Response<DeleteBlogResponse>, Status> {
        let id = request_id(&req);
        observe("DeleteBlog", id, self.delete(req.into_inner())).await
    }

    type ListBlogStream = ReceiverStream<ListBlogItem>;

    async fn list_blog(
        &self,
        req: Request<ListBlogRequest>,
    ) -> std::result::Result<Response<Self::ListBlogStream>, Status> {
        observe("ListBlog", request_id(&req), self.list()).await
    }
}
