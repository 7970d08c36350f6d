pub mod buffer;
pub mod camera;
pub mod capture;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod filter;
pub mod processing;
pub mod registry;
pub mod settings;
pub mod stats;
pub mod sync;
pub mod thread;

#[cfg(feature = "opencv")]
pub use opencv;

pub use self::{
	buffer::BoundedFrameQueue,
	camera::Camera,
	config::StreamConfig,
	controller::{StreamController, StreamStatus},
	display::{DisplayEvent, DisplaySink},
	error::{Error, Result},
	filter::FilterPipeline,
	registry::{StreamId, StreamRegistry},
	settings::{ProcessingSettings, Roi, SettingsHandle, SettingsSnapshot, SmoothType},
	stats::{LoopStatistics, RateStatistic},
	sync::SyncBarrier,
	thread::{LoopHandle, LoopState, Priority},
};
