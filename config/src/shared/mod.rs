mod base;
mod emitter;
mod formats;
mod ingest;
mod pipeline;
mod queue;
mod stream;

pub use base::*;
pub use emitter::*;
pub use formats::*;
pub use ingest::*;
pub use pipeline::*;
pub use queue::*;
pub use stream::*;
