//! Client code for offcache.
//!
//! This crate provides the network seam the worker fetches through and the
//! reqwest-backed client that talks to the origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network, UrlError, canonicalize, resolve_on_origin};

pub use reqwest::{Method, StatusCode, Url, header};
