pub mod buffer;
pub mod decode;
pub mod event;
pub mod format;
pub mod normalize;
pub mod orchestrator;

pub use buffer::{DEFAULT_BUFFER_CEILING, FrameBuffer};
pub use decode::Utf8StreamDecoder;
pub use event::{ParsedEvent, Usage};
pub use format::StreamFormat;
pub use orchestrator::{
    AccumulatedState, NoopReporter, StreamContext, StreamOrchestrator, StreamRecord,
    StreamReporter,
};
