//! Card list views: request parameters in, a normalized `ViewParams` out.
//!
//! | Module        | Responsibility                                        |
//! |---------------|-------------------------------------------------------|
//! | `params`      | `RequestParams`, ordered form-urlencoded pairs        |
//! | `filter`      | `[property][operator][value]` terms and matching      |
//! | `mql`         | `MqlCodec` trait and the conjunctive `SimpleMql`      |
//! | `view_params` | `ViewParams` construction and canonical encodings     |
//! | `query`       | Selecting and ordering cards for a view               |

pub mod filter;
pub mod mql;
pub mod params;
pub mod query;
pub mod view_params;

pub use filter::{FilterTerm, Operator};
pub use mql::{MqlCodec, MqlFilter, SimpleMql};
pub use params::RequestParams;
pub use view_params::{Filters, GroupBy, SortOrder, Style, ViewParams};
