use crate::config::TranscriptionConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

/// The external speech-recognition service: stateful, non-reentrant, slow.
///
/// Callers serialize invocations through a mutex; the trait therefore takes
/// `&mut self` and implementations need no internal locking. Returns the
/// recognized text segments in the engine's reported order.
pub trait SpeechEngine: Send {
    fn transcribe(&mut self, samples: &[f32]) -> Result<Vec<String>>;
}

/// Whisper-backed engine. The model is loaded once at construction; a failed
/// load means no engine (and thus no pipeline) exists, so an invalid handle
/// can never be invoked later.
pub struct WhisperEngine {
    // Context must outlive the reusable decoding state created from it.
    _ctx: Arc<WhisperContext>,
    state: WhisperState,
    config: TranscriptionConfig,
}

impl WhisperEngine {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let model_path = Self::model_path(&config.model)?;

        log::info!("loading Whisper model from {}", model_path.display());

        let ctx_params = WhisperContextParameters {
            use_gpu: config.use_gpu,
            ..Default::default()
        };

        let ctx = WhisperContext::new_with_params(&model_path.to_string_lossy(), ctx_params)
            .context("Failed to load Whisper model")?;
        let ctx = Arc::new(ctx);

        // Created once and reused across chunks; invocations are serialized
        // by the pipeline's engine mutex
        let state = ctx
            .create_state()
            .context("Failed to create Whisper state")?;

        log::info!("Whisper model loaded (GPU: {})", config.use_gpu);

        Ok(WhisperEngine {
            _ctx: ctx,
            state,
            config,
        })
    }

    pub fn model_path(model_name: &str) -> Result<PathBuf> {
        let models_dir = crate::config::Config::config_dir()?.join("models");

        let model_filename = format!("ggml-{}.bin", model_name);
        let model_path = models_dir.join(&model_filename);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\n\
                Download it with: chunked-transcribe download-model {}\n\
                (models live in {})",
                model_filename,
                model_name,
                models_dir.display()
            );
        }

        Ok(model_path)
    }
}

impl SpeechEngine for WhisperEngine {
    fn transcribe(&mut self, samples: &[f32]) -> Result<Vec<String>> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if !self.config.language.is_empty() && self.config.language != "auto" {
            params.set_language(Some(&self.config.language));
        }
        params.set_translate(false);

        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Suppress annotations like [BLANK_AUDIO], (coughs), etc.
        params.set_suppress_blank(true);
        params.set_suppress_non_speech_tokens(true);

        self.state
            .full(params, samples)
            .context("Failed to run Whisper transcription")?;

        let num_segments = self
            .state
            .full_n_segments()
            .context("Failed to get number of segments")?;

        let mut segments = Vec::with_capacity(num_segments as usize);
        for i in 0..num_segments {
            let segment = self
                .state
                .full_get_segment_text(i)
                .context("Failed to get segment text")?;
            segments.push(segment);
        }

        Ok(segments)
    }
}
