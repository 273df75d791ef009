//! Project data and its SQLite store.
//!
//! | Module   | Responsibility                                                  |
//! |----------|-----------------------------------------------------------------|
//! | `models` | `Project`, `Card`, `Page`, `User`, `Favorite`, import fixtures  |
//! | `db`     | `MingleDb`: migrations and row access for every table           |

pub mod db;
pub mod models;

pub use db::MingleDb;
pub use models::*;
