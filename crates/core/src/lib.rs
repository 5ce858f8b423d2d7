pub mod batch;
pub mod config;
pub mod engine;
pub mod format;
pub mod job;
pub mod metrics;
pub mod output;
pub mod testing;

pub use batch::{
    BatchConfig, BatchController, BatchError, BatchEvent, BatchStatus, Notice, NoticeLevel,
    SourceFile, StatusCounts, SubmitReport,
};
pub use config::{
    config_path_from_env, load_config, load_config_from_env, load_config_from_str,
    validate_config, Config, ConfigError, LoggingConfig, SanitizedConfig, ServerConfig,
};
pub use engine::{
    EngineAdapter, EngineConfig, EngineError, EngineLease, EngineProgress, FfmpegEngine,
    TranscodeEngine,
};
pub use format::{FormatError, OutputFormat};
pub use job::{JobError, JobId, JobSnapshot, JobStatus, ResultHandle};
pub use output::{OutputStore, StoredOutput};
