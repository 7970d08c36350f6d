use crate::registry::StreamId;
use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("stream {0} is already connected")]
	DuplicateStream(StreamId),
	#[error("stream {0} not found")]
	NotFound(StreamId),
	#[error("camera device {device} unavailable: {reason}")]
	CameraUnavailable { device: i32, reason: String },
	#[error("failed to grab frame: {0}")]
	Camera(String),
	#[error("filter pipeline failed: {0}")]
	Filter(String),
	#[error("failed to spawn thread")]
	Spawn(#[source] io::Error),
	#[error("thread {0} panicked")]
	Panicked(String),
}

impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidArgument(message.into())
	}
}

