pub mod stream_event;

// Re-export key types for convenience
pub use stream_event::{decode_image, decode_value, StreamBatch, StreamRecord, StreamRecordBody};
