//! Mailbox data types: messages, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod mail;
