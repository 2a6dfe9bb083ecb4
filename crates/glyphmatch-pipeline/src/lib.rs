pub mod config;
pub mod pipeline;
pub mod scheduler;

pub use config::PipelineConfig;
pub use pipeline::OcrPipeline;
pub use scheduler::PageScheduler;
