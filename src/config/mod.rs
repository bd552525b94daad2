// src/config/mod.rs
pub mod app;

pub use app::{
    AppConfig, ArticlesConfig, CacheBackend, CacheConfig, Credentials, Endpoints,
    RedisCredentials, TranslationConfig,
};
