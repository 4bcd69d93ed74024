pub mod http;
pub mod kv;

pub use http::HttpProductRepository;
pub use kv::KvProductRepository;
