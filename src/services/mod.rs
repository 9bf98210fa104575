//! Core services: collaborators (auth, metadata store, object store) and the
//! pipelines built on top of them.

pub mod auth;
pub mod faststart;
pub mod naming;
pub mod object_storage;
pub mod prober;
pub mod signing;
pub mod staging;
pub mod thumbnail_service;
pub mod uploader;
pub mod video_service;
pub mod video_store;
