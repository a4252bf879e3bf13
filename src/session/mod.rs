//! The editing session: one explicit state record plus the operations that move it.
//!
//! `Session` owns the state behind a lock and owns the single-flight guard. Model
//! calls read what they need, release the lock, await, and only then write the
//! outcome back, so a failed call leaves the state exactly as it was.

use anyhow::Context;
use fs_err as fs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::errors::{DeskError, Result};
use crate::followup::{self, CallSettings, FactCheckOutcome};
use crate::generate::{self, FlightGuard};
use crate::provider::DynProvider;
use crate::render::{strip_tags, word_count};
use crate::wire::{
    CopyEdit, EditStrength, FactCheckRecord, GenerationRequest, GenerationResult, Mode, ModelVariant,
    SourceItem, StructuredOutput,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub mode: Mode,
    pub edit_strength: EditStrength,
    pub model: ModelVariant,
    pub custom_instructions: String,
    pub sources: Vec<SourceItem>,
    pub result: Option<GenerationResult>,
    pub editing: bool,
    pub editing_html: String,
    pub revision_instructions: String,
    pub plagiarism_score: Option<u8>,
    pub fact_checks: Vec<FactCheckRecord>,
    pub show_fact_check: bool,
    pub show_changes_report: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            edit_strength: EditStrength::default(),
            model: ModelVariant::default(),
            custom_instructions: String::new(),
            sources: vec![SourceItem::empty()],
            result: None,
            editing: false,
            editing_html: String::new(),
            revision_instructions: String::new(),
            plagiarism_score: None,
            fact_checks: Vec::new(),
            show_fact_check: false,
            show_changes_report: false,
        }
    }
}

impl SessionState {
    /// Reads a saved session; a missing file is a fresh session.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let mut state: Self =
            serde_json::from_str(&raw).with_context(|| format!("parsing session {}", path.display()))?;
        if state.sources.is_empty() {
            state.sources.push(SourceItem::empty());
        }
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::publish::write_atomic(path, &json)
    }

    pub fn generation_request(&self) -> GenerationRequest {
        let custom = self.custom_instructions.trim();
        GenerationRequest {
            mode: self.mode,
            edit_strength: self.edit_strength,
            custom_instructions: (!custom.is_empty()).then(|| custom.to_string()),
            sources: self.sources.clone(),
            model: self.model,
        }
    }

    pub fn output_html(&self) -> &str {
        self.result.as_ref().map(GenerationResult::html).unwrap_or_default()
    }

    pub fn source_text(&self) -> String {
        generate::plain_source(&self.sources)
    }

    pub fn output_word_count(&self) -> usize {
        word_count(self.output_html())
    }

    pub fn source_word_count(&self) -> usize {
        strip_tags(&self.source_text()).split_whitespace().count()
    }

    pub fn has_source(&self) -> bool {
        self.sources.iter().any(SourceItem::has_text)
    }

    /// A new result replaces the old one wholesale; reports about the old output go with it.
    /// A copy edit that came back with a changes report opens it.
    fn accept(&mut self, result: GenerationResult) {
        self.show_changes_report = matches!(
            &result.output,
            StructuredOutput::Copyedit(CopyEdit { changes_report_html: Some(_), .. })
        );
        self.editing = false;
        self.editing_html = result.html().to_string();
        self.plagiarism_score = None;
        self.fact_checks.clear();
        self.show_fact_check = false;
        self.result = Some(result);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn set_edit_strength(&mut self, strength: EditStrength) {
        self.edit_strength = strength;
    }

    pub fn set_model(&mut self, model: ModelVariant) {
        self.model = model;
    }

    pub fn set_custom_instructions(&mut self, instructions: impl Into<String>) {
        self.custom_instructions = instructions.into();
    }

    pub fn set_revision_instructions(&mut self, instructions: impl Into<String>) {
        self.revision_instructions = instructions.into();
    }

    pub fn add_source(&mut self) -> Uuid {
        let item = SourceItem::empty();
        let id = item.id;
        self.sources.push(item);
        id
    }

    /// The last remaining source is never removed.
    pub fn remove_source(&mut self, id: Uuid) -> bool {
        if self.sources.len() <= 1 {
            return false;
        }
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        self.sources.len() != before
    }

    /// Replaces a source's content; `url: None` keeps the url it already had.
    pub fn update_source(&mut self, id: Uuid, text: String, html: String, url: Option<String>) -> bool {
        match self.sources.iter_mut().find(|s| s.id == id) {
            Some(item) => {
                item.text = text;
                item.html = html;
                if url.is_some() {
                    item.url = url;
                }
                true
            }
            None => false,
        }
    }

    /// Puts an item into the first blank slot, or appends it.
    pub fn place_source(&mut self, item: SourceItem) -> Uuid {
        let id = item.id;
        match self.sources.iter_mut().find(|s| !s.has_text()) {
            Some(slot) => *slot = item,
            None => self.sources.push(item),
        }
        id
    }

    pub fn start_editing(&mut self) {
        self.editing_html = self.output_html().to_string();
        self.editing = true;
    }

    pub fn commit_edit(&mut self, html: String) -> Result<()> {
        let result = self
            .result
            .as_mut()
            .ok_or_else(|| DeskError::EmptyContent("edit".into()))?;
        *result.output.html_mut() = html.clone();
        self.editing_html = html;
        self.editing = false;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing_html = self.output_html().to_string();
        self.editing = false;
    }

    pub fn toggle_fact_check(&mut self) -> bool {
        self.show_fact_check = !self.show_fact_check;
        self.show_fact_check
    }

    pub fn toggle_changes_report(&mut self) -> bool {
        self.show_changes_report = !self.show_changes_report;
        self.show_changes_report
    }

    /// Scores the current output against the plain sources and keeps the score.
    pub fn score_similarity(&mut self) -> u8 {
        let score = followup::score_similarity(self.output_html(), &self.source_text());
        self.plagiarism_score = Some(score);
        score
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_output_tokens: u32,
    pub light_output_tokens: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_output_tokens: 4000, light_output_tokens: 2000 }
    }
}

pub struct Session {
    state: Mutex<SessionState>,
    provider: DynProvider,
    flight: FlightGuard,
    limits: Limits,
}

impl Session {
    pub fn new(state: SessionState, provider: DynProvider, limits: Limits) -> Self {
        Self { state: Mutex::new(state), provider, flight: FlightGuard::new(), limits }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn into_state(self) -> SessionState {
        self.state.into_inner()
    }

    /// Synchronous edits; these never touch the model.
    pub fn update<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        f(&mut self.state.lock())
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    fn settings(&self, model: ModelVariant) -> CallSettings {
        CallSettings { model, max_tokens: self.limits.max_output_tokens }
    }

    pub async fn generate(&self) -> Result<GenerationResult> {
        let req = self.state.lock().generation_request();
        if !req.sources.iter().any(SourceItem::has_text) {
            return Err(DeskError::EmptySource("all sources blank".into()));
        }
        let _ticket = self.flight.begin("generate")?;
        let result =
            generate::generate(self.provider.as_ref(), &req, self.limits.max_output_tokens).await?;
        self.state.lock().accept(result.clone());
        Ok(result)
    }

    pub async fn enrich_seo(&self) -> Result<GenerationResult> {
        let (html, model) = {
            let s = self.state.lock();
            (s.output_html().to_string(), s.model)
        };
        if html.trim().is_empty() {
            return Err(DeskError::EmptyContent("generate SEO for".into()));
        }
        let _ticket = self.flight.begin("seo")?;
        let result = followup::enrich_seo(self.provider.as_ref(), self.settings(model), &html).await?;
        let mut s = self.state.lock();
        s.accept(result.clone());
        s.mode = Mode::Seo;
        Ok(result)
    }

    pub async fn revise(&self) -> Result<GenerationResult> {
        let (current, instructions, model) = {
            let s = self.state.lock();
            (s.result.as_ref().map(|r| r.output.clone()), s.revision_instructions.clone(), s.model)
        };
        let Some(current) = current else {
            return Err(DeskError::MissingInstruction("nothing generated yet".into()));
        };
        let _ticket = self.flight.begin("revise")?;
        let result =
            followup::revise(self.provider.as_ref(), self.settings(model), &current, &instructions).await?;
        self.state.lock().accept(result.clone());
        Ok(result)
    }

    pub async fn fact_check(&self) -> Result<FactCheckOutcome> {
        let (html, source, model) = {
            let s = self.state.lock();
            (s.output_html().to_string(), s.source_text(), s.model)
        };
        if html.trim().is_empty() {
            return Err(DeskError::EmptyContent("fact-check".into()));
        }
        let _ticket = self.flight.begin("factcheck")?;
        let outcome =
            followup::fact_check(self.provider.as_ref(), self.settings(model), &html, &source).await?;
        let mut s = self.state.lock();
        s.fact_checks = outcome.report.records.clone();
        s.show_fact_check = true;
        Ok(outcome)
    }

    /// Fetches a URL through the model and files it as source material.
    pub async fn extract_source(&self, url: &str) -> Result<SourceItem> {
        let model = self.state.lock().model;
        let _ticket = self.flight.begin("extract")?;
        let settings = CallSettings { model, max_tokens: self.limits.light_output_tokens };
        let item = followup::extract_article(self.provider.as_ref(), settings, url).await?;
        self.state.lock().place_source(item.clone());
        Ok(item)
    }

    pub fn score_similarity(&self) -> u8 {
        self.state.lock().score_similarity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{GatedProvider, ScriptedProvider};
    use std::sync::Arc;

    fn session_with(provider: DynProvider, text: &str) -> Session {
        let mut state = SessionState::default();
        state.sources = vec![SourceItem::from_text(text, None)];
        state.mode = Mode::Standard;
        Session::new(state, provider, Limits::default())
    }

    #[test]
    fn new_state_has_one_empty_source() {
        let s = SessionState::default();
        assert_eq!(s.sources.len(), 1);
        assert!(!s.has_source());
        assert!(s.result.is_none());
    }

    #[test]
    fn last_source_cannot_be_removed() {
        let mut s = SessionState::default();
        let first = s.sources[0].id;
        assert!(!s.remove_source(first));
        let second = s.add_source();
        assert!(s.update_source(second, "Text".into(), "<p>Text</p>".into(), Some("https://x.example".into())));
        assert!(s.remove_source(first));
        assert_eq!(s.sources.len(), 1);
        assert_eq!(s.sources[0].url.as_deref(), Some("https://x.example"));
        assert!(!s.update_source(Uuid::new_v4(), String::new(), String::new(), None));
    }

    #[test]
    fn update_without_url_keeps_the_old_one() {
        let mut s = SessionState::default();
        let id = s.sources[0].id;
        s.update_source(id, "a".into(), "<p>a</p>".into(), Some("https://a.example".into()));
        s.update_source(id, "b".into(), "<p>b</p>".into(), None);
        assert_eq!(s.sources[0].text, "b");
        assert_eq!(s.sources[0].url.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn setters_change_only_their_field() {
        let mut s = SessionState::default();
        s.set_mode(Mode::Headlines);
        s.set_edit_strength(EditStrength::Heavy);
        s.set_model(ModelVariant::Haiku);
        s.set_custom_instructions("verify the dates");
        s.set_revision_instructions("shorter");

        let req = s.generation_request();
        assert_eq!(req.mode, Mode::Headlines);
        assert_eq!(req.edit_strength, EditStrength::Heavy);
        assert_eq!(req.model, ModelVariant::Haiku);
        assert_eq!(req.custom_instructions.as_deref(), Some("verify the dates"));
        assert_eq!(s.revision_instructions, "shorter");
        assert_eq!(s.sources.len(), 1);
    }

    #[test]
    fn clear_restores_the_initial_shape() {
        let mut s = SessionState::default();
        s.add_source();
        s.mode = Mode::Snark;
        s.plagiarism_score = Some(40);
        s.revision_instructions = "shorter".into();
        s.show_fact_check = true;
        s.clear();

        assert_eq!(s.sources.len(), 1);
        assert!(!s.sources[0].has_text());
        assert!(s.result.is_none());
        assert!(s.plagiarism_score.is_none());
        assert!(s.fact_checks.is_empty());
        assert!(!s.show_fact_check);
        assert_eq!(s.mode, Mode::Copyedit);
        assert!(s.revision_instructions.is_empty());
    }

    #[tokio::test]
    async fn generate_stores_result_and_leaves_edit_mode() {
        let provider = Arc::new(ScriptedProvider::with_text("Fresh **post**"));
        let session = session_with(provider.clone(), "Source story");
        session.update(|s| s.start_editing());

        let result = session.generate().await.unwrap();
        let state = session.snapshot();
        assert_eq!(state.result.as_ref(), Some(&result));
        assert!(!state.editing);
        assert_eq!(state.output_html(), "<p>Fresh <strong>post</strong></p>");
        assert_eq!(state.output_word_count(), 2);
    }

    #[tokio::test]
    async fn changes_report_opens_only_for_a_reported_copy_edit() {
        let provider = Arc::new(ScriptedProvider::with_text("Edited\n\n---CHANGES---\n\n- Fixed a typo"));
        provider.push_text("Plain **post**");
        let session = session_with(provider, "Source story");
        session.update(|s| s.set_mode(Mode::Copyedit));

        session.generate().await.unwrap();
        assert!(session.snapshot().show_changes_report);

        session.update(|s| s.set_mode(Mode::Standard));
        session.generate().await.unwrap();
        assert!(!session.snapshot().show_changes_report);
    }

    #[tokio::test]
    async fn copy_edit_without_report_keeps_it_closed() {
        let provider = Arc::new(ScriptedProvider::with_text("Just the edited text"));
        let session = session_with(provider, "Source story");
        session.update(|s| {
            s.set_mode(Mode::Copyedit);
            s.toggle_changes_report();
        });

        session.generate().await.unwrap();
        assert!(!session.snapshot().show_changes_report);
    }

    #[tokio::test]
    async fn failed_generation_leaves_state_untouched() {
        let provider = Arc::new(ScriptedProvider::with_text("First result"));
        provider.push_failure("API error: 500");
        let session = session_with(provider, "Source story");
        session.generate().await.unwrap();
        let before = session.snapshot();

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, DeskError::Transport(_)));
        assert_eq!(session.snapshot(), before);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn empty_sources_fail_before_the_model() {
        let provider = Arc::new(ScriptedProvider::with_text("unused"));
        let session = Session::new(SessionState::default(), provider.clone(), Limits::default());
        let err = session.generate().await.unwrap_err();
        assert_eq!(err.user_message(), "Please paste source material first");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn second_call_while_pending_is_rejected() {
        let gated = Arc::new(GatedProvider::with_text("The first result"));
        let session = Arc::new(session_with(gated.clone(), "Source story"));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.generate().await }
        });
        gated.started.notified().await;
        assert!(session.is_busy());

        let err = session.generate().await.unwrap_err();
        assert!(err.is_busy());
        let err = session.extract_source("https://news.example/b").await.unwrap_err();
        assert!(err.is_busy());

        gated.release.notify_one();
        let landed = first.await.unwrap().unwrap();
        assert_eq!(landed.html(), "<p>The first result</p>");
        assert_eq!(session.snapshot().output_html(), "<p>The first result</p>");
        assert_eq!(gated.inner.calls(), 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn seo_switches_mode_and_revise_keeps_it() {
        let provider = Arc::new(ScriptedProvider::with_text("A post"));
        provider.push_text("KEYPHRASES\nbridge history");
        provider.push_text("Shorter SEO package");
        let session = session_with(provider, "Source story");

        session.generate().await.unwrap();
        let seo = session.enrich_seo().await.unwrap();
        assert_eq!(seo.mode(), Mode::Seo);
        assert_eq!(session.snapshot().mode, Mode::Seo);

        session.update(|s| s.revision_instructions = "shorter".into());
        let revised = session.revise().await.unwrap();
        assert_eq!(revised.mode(), Mode::Seo);
        assert_eq!(revised.html(), "<p>Shorter SEO package</p>");
    }

    #[tokio::test]
    async fn fact_check_records_and_shows_findings() {
        let provider = Arc::new(ScriptedProvider::with_text("The bridge opened in 1932."));
        provider.push_text("CLAIM: opened in 1932\nSTATUS: VERIFIED\nSOURCE: \"1932\"");
        let session = session_with(provider.clone(), "The bridge opened in 1932 to great fanfare.");

        assert!(session.fact_check().await.is_err());
        session.generate().await.unwrap();
        let outcome = session.fact_check().await.unwrap();
        assert_eq!(outcome.records().len(), 1);

        let state = session.snapshot();
        assert!(state.show_fact_check);
        assert_eq!(state.fact_checks, outcome.report.records);
        assert!(provider.last_prompt().unwrap().contains("Source Material:\nThe bridge opened in 1932 to great fanfare."));
    }

    #[tokio::test]
    async fn similarity_score_is_stored() {
        let text = "the council voted to approve the budget on tuesday night";
        let provider = Arc::new(ScriptedProvider::with_text(text));
        let session = session_with(provider, text);
        session.generate().await.unwrap();
        assert_eq!(session.score_similarity(), 100);
        assert_eq!(session.snapshot().plagiarism_score, Some(100));
    }

    #[tokio::test]
    async fn extracted_source_fills_the_blank_slot() {
        let provider = Arc::new(ScriptedProvider::with_text("Article body"));
        let session = Session::new(SessionState::default(), provider, Limits::default());
        session.extract_source("https://news.example/a").await.unwrap();
        let state = session.snapshot();
        assert_eq!(state.sources.len(), 1);
        assert_eq!(state.sources[0].text, "Article body");
    }

    #[test]
    fn edits_commit_into_the_current_output() {
        let mut s = SessionState::default();
        assert!(s.commit_edit("<p>x</p>".into()).is_err());

        s.result = Some(GenerationResult {
            raw_text: "x".into(),
            output: StructuredOutput::Standard(crate::wire::Post { html: "<p>old</p>".into() }),
            dropped_segments: 0,
            created_at: chrono::Utc::now(),
        });
        s.start_editing();
        assert!(s.editing);
        assert_eq!(s.editing_html, "<p>old</p>");
        s.editing_html = "<p>scratch</p>".into();
        s.cancel_edit();
        assert_eq!(s.output_html(), "<p>old</p>");

        s.start_editing();
        s.commit_edit("<p>new</p>".into()).unwrap();
        assert!(!s.editing);
        assert_eq!(s.output_html(), "<p>new</p>");
        assert!(s.toggle_changes_report());
        assert!(!s.toggle_changes_report());
    }

    #[test]
    fn state_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        assert_eq!(SessionState::load(&path).unwrap().sources.len(), 1);

        let mut s = SessionState::default();
        s.mode = Mode::Wikipedia;
        s.save(&path).unwrap();
        assert_eq!(SessionState::load(&path).unwrap(), s);
    }
}
