//! Mailbox parsing: streaming MBOX scan, header decoding, and MIME attachments.

pub mod header;
pub mod mbox;
pub mod mime;
