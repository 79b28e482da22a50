pub mod models;
pub mod query;
pub mod repo;

mod memory;
pub use memory::MemoryStore;

pub use models::{Article, AuthorSnapshot, Comment, User, UserInfo};
pub use query::{ArticleFilter, UserSet, Window, PAGE_SIZE};
pub use repo::{
    ArticleFields, DocumentStore, LikeChange, ProfileFields, StoreError, StoreResult,
};
