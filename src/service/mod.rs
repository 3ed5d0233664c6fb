//! Blog service
//!
//! Request path: gRPC adapter -> identifier codec -> repository -> engine,
//! with the stream emitter driving cursors for ListBlog.

pub mod codec;
pub mod grpc;
pub mod http;
pub mod model;
pub mod repository;
pub mod server;
pub mod stream;

pub use grpc::BlogGrpcService;
pub use model::BlogItem;
pub use repository::BlogRepository;
pub use server::BlogServer;
