//! Core data models for the video hosting service.
//!
//! `Video` maps to the `videos` table via `sqlx::FromRow` and serializes as
//! JSON via `serde`. `ObjectReference` is the typed form of the
//! `{bucket},{key}` string persisted in `videos.video_url`.

pub mod reference;
pub mod video;
