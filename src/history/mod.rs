//! History filters, feed tokens and subscriptions.
//!
//! | Module         | Responsibility                                          |
//! |----------------|---------------------------------------------------------|
//! | `filter`       | `HistoryFilterParams`, `Period`, deterministic params   |
//! | `token`        | AES-256-GCM feed tokens (`HistoryTokenCipher`)          |
//! | `subscription` | Idempotent subscribe, orphan-aware unsubscribe          |

pub mod filter;
pub mod subscription;
pub mod token;

pub use filter::{EventType, HistoryFilterParams, Period};
pub use subscription::SubscriptionService;
pub use token::HistoryTokenCipher;
