#[cfg(feature = "opencv")]
pub mod opencv;

use crate::error::Result;

/// A connected capture device.
///
/// The device is closed when the value is dropped; capture loops own their
/// camera and drop it on exit.
pub trait Camera: Send + 'static {
	type Frame: Send + 'static;

	/// Blocks until the device delivers its next frame.
	fn grab(&mut self) -> Result<Self::Frame>;

	/// Frame size as `(width, height)`.
	fn resolution(&self) -> (i32, i32);

	fn close(self)
	where
		Self: Sized,
	{
		drop(self)
	}
}
