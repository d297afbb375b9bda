//! Mailbox search: keyword expressions and the combined archive query.
//!
//! The query has the same shape as the one sent to a Gmail mailbox:
//!
//! ```text
//! (請求書 OR Invoice) has:attachment newer_than:7d -label:請求書-処理済み
//! ```
//!
//! Against a local MBOX it is evaluated on header metadata plus the
//! attachment listing of each candidate message.

pub mod keyword;
pub mod query;

pub use keyword::KeywordExpr;
pub use query::SearchQuery;
