//! `invoice-archiver`: save invoice attachments from a mailbox into a
//! storage folder.
//!
//! The job is driven by a small configuration: search keywords, a lookback
//! window in days, a processed label, a target folder id, and a filename
//! template. This crate provides the validated configuration, the template
//! renderer, MBOX access, the search, the storage writer, and the run that
//! ties them together.

pub mod archive;
pub mod config;
pub mod error;
pub mod i18n;
pub mod label;
pub mod ledger;
pub mod model;
pub mod parser;
pub mod search;
pub mod storage;
pub mod store;
pub mod template;
