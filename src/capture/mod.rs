pub mod backend;
pub mod media;
pub mod remote;

pub use backend::{
    negotiate_mime_type, CaptureError, CaptureProvider, CaptureRequest, MediaChunk, MediaStream,
    FALLBACK_MIME_TYPE,
};
pub use media::CapturedMedia;
pub use remote::{DeviceOutcome, DeviceReport, FeedError, RemoteCapture};
