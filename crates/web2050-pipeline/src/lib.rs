//! On-demand page generation for web2050.
//!
//! A request path is normalized into a canonical key ([`PagePath`]). Stored
//! pages are served as-is. Missing pages are generated by a
//! [`ContentGenerator`], with at most one generation per group in flight
//! ([`GenerationCoordinator`]). The generator's line-framed event stream is
//! decoded ([`EventDecoder`]), the designated output region is extracted
//! ([`TagExtractor`]) and streamed to the caller, and the full result is
//! persisted once the stream completes.
//!
//! # Example
//!
//! ```ignore
//! use web2050_pipeline::{GenerationPipeline, OpenAiGenerator, Resolution};
//!
//! let generator = OpenAiGenerator::from_config(&config.generator)?;
//! let pipeline = GenerationPipeline::new(store, context, Arc::new(generator), "_out");
//! match pipeline.resolve("/example.com/about").await? {
//!     Resolution::Stored(page) => println!("{}", page.content),
//!     Resolution::Generated(stream) => println!("{}", stream.collect().await?),
//! }
//! ```

mod coordinator;
mod error;
mod extractor;
mod framing;
mod generator;
mod openai;
mod path;
mod pipeline;
mod prompt;
#[cfg(any(test, feature = "mock"))]
mod scripted;

pub use coordinator::{Acquisition, GenerationCoordinator, GenerationGuard, WaitHandle};
pub use error::PipelineError;
pub use extractor::TagExtractor;
pub use framing::EventDecoder;
pub use generator::{ByteStream, ContentGenerator, GenerationError};
pub use openai::OpenAiGenerator;
pub use path::{MAX_KEY_LENGTH, PagePath, PathError};
pub use pipeline::{GenerationPipeline, PageStream, Resolution};
pub use prompt::{ChatMessage, build_messages};
#[cfg(any(test, feature = "mock"))]
pub use scripted::{Gate, ScriptedGenerator, event_line};
