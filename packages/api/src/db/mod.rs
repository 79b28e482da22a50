//! # Database module: PostgreSQL persistence
//!
//! Compiled with the `postgres` feature. The server opens one pool at startup
//! with [`connect`], applies the embedded migrations with [`migrate`] and hands
//! a [`PgStore`] to the router as its [`store::DocumentStore`].
//!
//! ## Schema
//!
//! | Table | Notes |
//! |-------|-------|
//! | `users` | `username` is unique; `my_articles`, `liked_articles`, `followers`, `following` are `UUID[]` |
//! | `articles` | denormalized author columns, `likes >= 0`, ordered `comments UUID[]`, `seq` breaks `created_at` ties |
//! | `comments` | denormalized author columns, `article_id` |

mod pg_store;
mod pool;

pub use pg_store::PgStore;
pub use pool::{connect, migrate};
