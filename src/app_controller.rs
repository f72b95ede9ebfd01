use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::document_processor::{self, DocumentMeta, PageRange};
use crate::language_utils;
use crate::providers::TranslationClient;
use crate::providers::openai::OpenAICompatible;
use crate::translation::escalation::{ConsolePrompt, EscalationGate, EscalationHandler, FixedDecision};
use crate::translation::{DispatchScheduler, OutputRecord, PageRecord, RunSummary, aggregate, plan_batches, summarize};

// @module: Application controller for document translation

/// Result of one translated document
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Where the Markdown output was written
    pub output_path: PathBuf,
    /// Output records in page order
    pub records: Vec<OutputRecord>,
    /// Run statistics
    pub summary: RunSummary,
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Backend override, the configured HTTP backend when unset
    client: Option<Arc<dyn TranslationClient>>,
    // @field: Escalation override, derived from config when unset
    handler: Option<Arc<dyn EscalationHandler>>,
    // @field: Draw the progress bar
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        Ok(Self {
            config,
            client: None,
            handler: None,
            show_progress: true,
        })
    }

    /// Use `client` instead of the configured HTTP backend
    pub fn with_client(mut self, client: Arc<dyn TranslationClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use `handler` to resolve batches that exhausted their retries
    pub fn with_escalation_handler(mut self, handler: Arc<dyn EscalationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Disable the progress bar
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send a short request to the configured backend
    pub async fn test_connection(&self) -> Result<()> {
        let client = OpenAICompatible::from_config(&self.config)?;
        info!(
            "Testing connection to {} (model {})",
            self.config.backend.endpoint, self.config.backend.model
        );
        client
            .test_connection()
            .await
            .map_err(|e| anyhow!("Connection test failed: {}", e))?;
        info!("Connection test succeeded");
        Ok(())
    }

    /// Translate one document and write the Markdown result
    ///
    /// Returns `None` when the document has no text to translate. An operator
    /// abort in immediate mode surfaces as a `DispatchError` inside the
    /// returned error and no output is written.
    pub async fn run(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        page_range: Option<PageRange>,
    ) -> Result<Option<RunReport>> {
        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let pages = document_processor::load_pages(input_file, page_range)?;
        if pages.iter().all(|page| page.text.trim().is_empty()) {
            warn!("No text found in {:?}, nothing to translate", input_file);
            return Ok(None);
        }

        if language_utils::languages_match(&self.config.source_language, &self.config.target_language) {
            warn!(
                "Source and target language are both {}",
                language_utils::display_name(&self.config.target_language)
            );
        }

        let (records, summary) = self.translate_pages(&pages).await?;

        let output_dir = output_dir.unwrap_or_else(|| input_file.parent().unwrap_or(Path::new(".")));
        let output_path = document_processor::output_path(
            input_file,
            output_dir,
            &self.config.source_language,
            &self.config.target_language,
        );
        let meta = DocumentMeta {
            source_name: input_file
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            source_language: self.config.source_language.clone(),
            target_language: self.config.target_language.clone(),
        };
        document_processor::write_markdown(&output_path, &records, &meta)?;

        info!("Success: {:?}", output_path);
        Ok(Some(RunReport {
            output_path,
            records,
            summary,
        }))
    }

    /// Plan, dispatch and aggregate the given pages
    pub async fn translate_pages(&self, pages: &[PageRecord]) -> Result<(Vec<OutputRecord>, RunSummary)> {
        let start_time = Instant::now();
        let batching = &self.config.batching;
        let batches = plan_batches(pages, batching.max_chars_per_batch, batching.context_tail_chars);

        let progress_bar = self.progress_bar(batches.len() as u64);
        let client = self.client()?;
        let gate = EscalationGate::new(self.escalation_handler(&progress_bar));
        let scheduler = DispatchScheduler::new(client, gate, self.config.scheduler_options());

        info!(
            "Translating {} page(s) in {} batch(es): {} -> {} with {}",
            pages.len(),
            batches.len(),
            language_utils::display_name(&self.config.source_language),
            language_utils::display_name(&self.config.target_language),
            self.config.backend.model
        );
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let outcomes = scheduler
            .run(batches, move |completed, _total| {
                pb.set_position(completed as u64);
            })
            .await;
        progress_bar.finish_and_clear();
        let outcomes = outcomes?;

        let records = aggregate(pages, &outcomes);
        let summary = summarize(&outcomes, &records, start_time.elapsed());
        for line in summary.summary().lines() {
            info!("{}", line);
        }
        if !summary.failed_pages.is_empty() {
            warn!("{} page(s) could not be translated", summary.failed_pages.len());
        }

        Ok((records, summary))
    }

    fn client(&self) -> Result<Arc<dyn TranslationClient>> {
        Ok(match &self.client {
            Some(client) => Arc::clone(client),
            None => Arc::new(OpenAICompatible::from_config(&self.config)?),
        })
    }

    fn escalation_handler(&self, progress_bar: &ProgressBar) -> Arc<dyn EscalationHandler> {
        if let Some(handler) = &self.handler {
            return Arc::clone(handler);
        }
        match self.config.on_exhausted.fixed_decision() {
            Some(decision) => {
                debug!("Exhausted batches are resolved with {:?}", decision);
                Arc::new(FixedDecision(decision))
            }
            None => Arc::new(ConsolePrompt::with_progress(progress_bar.clone())),
        }
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }
}
