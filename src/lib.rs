// https://stackoverflow.com/a/61417700
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Cache levels.
pub mod cache;

/// Composition of stages.
pub mod compose;

/// Completion contexts.
pub mod dispatch;

/// Network fetcher.
pub mod fetcher;

/// Settle-once asynchronous results.
pub mod promise;
