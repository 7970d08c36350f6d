#[cfg(feature = "opencv")]
pub mod opencv;

use crate::{error::Result, settings::SettingsSnapshot};

/// Turns a captured frame into the frame that gets displayed.
///
/// Implementations get one settings snapshot per frame and must not hold on
/// to it between calls.
pub trait FilterPipeline<F>: Send + 'static {
	fn apply(&mut self, frame: F, snapshot: &SettingsSnapshot) -> Result<F>;
}

impl<F, Func> FilterPipeline<F> for Func
where
	Func: FnMut(F, &SettingsSnapshot) -> Result<F> + Send + 'static,
{
	fn apply(&mut self, frame: F, snapshot: &SettingsSnapshot) -> Result<F> {
		self(frame, snapshot)
	}
}

/// Passes frames through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl<F: Send + 'static> FilterPipeline<F> for Passthrough {
	fn apply(&mut self, frame: F, _: &SettingsSnapshot) -> Result<F> {
		Ok(frame)
	}
}
