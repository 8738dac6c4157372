use std::cell::Cell;
use std::rc::Rc;

use super::data::{GeneratedImageRecord, GenerationSettings, HistoryStats, Setting};
use super::logs::{metadata, LogStore, Metadata};
use super::store::{KvStore, HISTORY_KEY};
use crate::backend::download::DownloadRequest;
use crate::backend::GenerationRequest;
use crate::error::{DownloadError, GenerateError, StoreError};

pub const EMPTY_PROMPT_ERROR: &str = "Please enter a prompt";

/// The generation session: prompt, settings, in-flight status and history.
///
/// A generation is split in two so the UI never blocks:
/// `begin_generation` runs synchronously and hands back a request,
/// the backend future runs on the executor (`backend::run_generation`),
/// then `finish_generation` applies the outcome.
pub struct Session {
    prompt: String,
    settings: GenerationSettings,
    generating: Cell<bool>,
    history: Vec<GeneratedImageRecord>,
    last_error: Option<String>,
    store: Rc<dyn KvStore>,
    logs: Rc<LogStore>,
}

/// Clears the generating flag when dropped, on every exit path
struct GeneratingGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl Session {
    /// Create a session, restoring history from the store.
    /// Missing history starts empty; unreadable history is logged and skipped.
    pub fn restore(store: Rc<dyn KvStore>, logs: Rc<LogStore>) -> Self {
        let history = match load_history(store.as_ref()) {
            Ok(history) => history,
            Err(err) => {
                logs.error(
                    "Failed to load generated images from storage",
                    Some(metadata([("error", err.to_string().into())])),
                );
                Vec::new()
            }
        };

        Self {
            prompt: String::new(),
            settings: GenerationSettings::default(),
            generating: Cell::new(false),
            history,
            last_error: None,
            store,
            logs,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    pub fn is_generating(&self) -> bool {
        self.generating.get()
    }

    /// Newest first
    pub fn history(&self) -> &[GeneratedImageRecord] {
        &self.history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[cfg(test)]
    fn logs(&self) -> &LogStore {
        &self.logs
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            total: self.history.len(),
            last_generated: self.history.first().map(|record| record.timestamp),
        }
    }

    pub fn update_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    /// Change one setting. Ignored while a generation is in flight.
    pub fn update_setting(&mut self, setting: Setting) -> bool {
        if self.is_generating() {
            return false;
        }
        self.settings.apply(setting);
        true
    }

    /// Validate the prompt and enter the generating state.
    ///
    /// Returns `None` when the prompt is blank (and sets the error) or when
    /// a generation is already running. The check and the set happen in
    /// this one call, so no second generation can slip in.
    pub fn begin_generation(&mut self) -> Option<GenerationRequest> {
        if self.is_generating() {
            self.logs.debug("Generation already in progress, request ignored", None);
            return None;
        }

        if self.prompt.trim().is_empty() {
            self.last_error = Some(EMPTY_PROMPT_ERROR.to_string());
            return None;
        }

        self.generating.set(true);
        self.last_error = None;

        let request = GenerationRequest {
            prompt: self.prompt.clone(),
            settings: self.settings,
        };
        self.logs.info(
            "Starting image generation",
            Some(request_metadata(&request)),
        );
        Some(request)
    }

    /// Apply the backend's outcome and leave the generating state
    pub fn finish_generation(
        &mut self,
        request: GenerationRequest,
        outcome: Result<String, GenerateError>,
    ) {
        let _generating = GeneratingGuard {
            flag: &self.generating,
        };

        match outcome {
            Ok(url) => {
                let record = GeneratedImageRecord::new(url, request.prompt, request.settings);
                let image_id = record.id.clone();
                self.history.insert(0, record);

                if let Err(err) = save_history(self.store.as_ref(), &self.history) {
                    self.logs.warn(
                        "Failed to save generated image to storage",
                        Some(metadata([("error", err.to_string().into())])),
                    );
                }

                self.logs.info(
                    "Image generation completed successfully",
                    Some(metadata([("imageId", image_id.into())])),
                );
            }
            Err(err) => {
                let message = err.to_string();
                self.logs.error(
                    "Image generation failed",
                    Some(metadata([
                        ("error", message.clone().into()),
                        ("prompt", request.prompt.into()),
                    ])),
                );
                self.last_error = Some(message);
            }
        }
    }

    /// Empty the history and drop the persisted copy.
    /// A store failure is logged, never raised.
    pub fn clear_history(&mut self) {
        self.history.clear();

        match self.store.remove(HISTORY_KEY) {
            Ok(()) => self.logs.info("Generation history cleared", None),
            Err(err) => self.logs.error(
                "Failed to clear generation history from storage",
                Some(metadata([("error", err.to_string().into())])),
            ),
        }
    }

    /// Describe the download of the record at `index`, if it exists
    pub fn download_request(&self, index: usize) -> Option<DownloadRequest> {
        self.history.get(index).map(|record| DownloadRequest {
            url: record.url.clone(),
            index,
        })
    }

    pub fn finish_download(
        &mut self,
        request: &DownloadRequest,
        result: Result<std::path::PathBuf, DownloadError>,
    ) {
        match result {
            Ok(path) => self.logs.info(
                "Image downloaded",
                Some(metadata([
                    ("imageUrl", request.url.as_str().into()),
                    ("path", path.display().to_string().into()),
                ])),
            ),
            Err(DownloadError::Cancelled) => self.logs.info(
                "Download cancelled",
                Some(metadata([("imageUrl", request.url.as_str().into())])),
            ),
            Err(err) => {
                let message = err.to_string();
                self.logs.error(
                    "Download failed",
                    Some(metadata([
                        ("error", message.clone().into()),
                        ("imageUrl", request.url.as_str().into()),
                    ])),
                );
                self.last_error = Some(message);
            }
        }
    }
}

fn request_metadata(request: &GenerationRequest) -> Metadata {
    metadata([
        ("prompt", request.prompt.as_str().into()),
        ("width", request.settings.width.into()),
        ("height", request.settings.height.into()),
        ("steps", request.settings.steps.into()),
        ("guidance", request.settings.guidance.into()),
    ])
}

fn load_history(store: &dyn KvStore) -> Result<Vec<GeneratedImageRecord>, StoreError> {
    match store.get(HISTORY_KEY)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

fn save_history(store: &dyn KvStore, history: &[GeneratedImageRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_string(history)?;
    store.set(HISTORY_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{run_generation, GenerationFuture, ImageBackend, PlaceholderBackend};
    use crate::state::logs::LogLevel;
    use crate::state::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    /// begin, await the backend, finish: what the UI does across two messages
    async fn generate(session: &mut Session, backend: Arc<dyn ImageBackend>) {
        let Some(request) = session.begin_generation() else {
            return;
        };
        let outcome = run_generation(backend, request.clone()).await;
        session.finish_generation(request, outcome);
    }

    /// Reads work, every write fails
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl KvStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".to_string()))
        }
    }

    /// Reads find nothing, writes panic
    struct PanickingStore;

    impl KvStore for PanickingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            panic!("store write to {key} aborted")
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            panic!("store remove of {key} aborted")
        }
    }

    struct FailingBackend;

    impl ImageBackend for FailingBackend {
        fn generate(&self, _request: &GenerationRequest) -> GenerationFuture {
            Box::pin(async { Err(GenerateError::Backend("service unavailable".to_string())) })
        }
    }

    fn instant_backend() -> Arc<dyn ImageBackend> {
        Arc::new(PlaceholderBackend::new(Duration::ZERO, "https://picsum.photos"))
    }

    fn new_session() -> (Rc<MemoryStore>, Session) {
        let store = Rc::new(MemoryStore::new());
        let logs = Rc::new(LogStore::load(store.clone()));
        let session = Session::restore(store.clone(), logs);
        (store, session)
    }

    fn persisted_history(store: &dyn KvStore) -> Vec<GeneratedImageRecord> {
        load_history(store).unwrap()
    }

    #[tokio::test]
    async fn test_neon_cat_scenario() {
        let (store, mut session) = new_session();
        session.update_prompt("a neon cat");

        generate(&mut session, instant_backend()).await;

        let record = &session.history()[0];
        assert_eq!(record.prompt, "a neon cat");
        assert_eq!(record.settings.width, 512);
        assert!(record.url.starts_with("https://picsum.photos/512/512?random="));
        assert!(!session.is_generating());
        assert_eq!(session.last_error(), None);
        assert_eq!(persisted_history(store.as_ref()), session.history());
    }

    #[tokio::test]
    async fn test_blank_prompts_are_rejected() {
        for prompt in ["", "   ", "\n\t"] {
            let (store, mut session) = new_session();
            session.update_prompt(prompt);

            generate(&mut session, instant_backend()).await;

            assert_eq!(session.last_error(), Some(EMPTY_PROMPT_ERROR));
            assert!(session.history().is_empty());
            assert!(!session.is_generating());
            assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_each_success_prepends_one_record() {
        let (store, mut session) = new_session();

        session.update_prompt("first");
        generate(&mut session, instant_backend()).await;
        session.update_prompt("second");
        generate(&mut session, instant_backend()).await;

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].prompt, "second");
        assert_eq!(session.history()[1].prompt, "first");
        assert_eq!(persisted_history(store.as_ref()), session.history());
    }

    #[tokio::test]
    async fn test_record_settings_are_a_snapshot() {
        let (_store, mut session) = new_session();
        session.update_prompt("a neon cat");
        generate(&mut session, instant_backend()).await;

        assert!(session.update_setting(Setting::Width(1024)));
        assert!(session.update_setting(Setting::Guidance(12.0)));

        assert_eq!(session.settings().width, 1024);
        assert_eq!(session.history()[0].settings, GenerationSettings::default());
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_history() {
        let (_store, mut session) = new_session();
        session.update_prompt("a neon cat");

        generate(&mut session, Arc::new(FailingBackend)).await;

        assert!(session.history().is_empty());
        assert!(!session.is_generating());
        assert_eq!(session.last_error(), Some("service unavailable"));

        let last = session.logs().logs().pop().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.message, "Image generation failed");
    }

    #[test]
    fn test_second_begin_is_rejected_while_generating() {
        let (_store, mut session) = new_session();
        session.update_prompt("a neon cat");

        let request = session.begin_generation().unwrap();
        assert!(session.is_generating());
        assert!(session.begin_generation().is_none());
        assert!(!session.update_setting(Setting::Steps(40)));
        assert_eq!(session.settings().steps, 20);

        session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));
        assert!(!session.is_generating());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_next_attempt_clears_previous_error() {
        let (_store, mut session) = new_session();
        assert!(session.begin_generation().is_none());
        assert_eq!(session.last_error(), Some(EMPTY_PROMPT_ERROR));

        session.update_prompt("a neon cat");
        let request = session.begin_generation().unwrap();
        assert_eq!(session.last_error(), None);
        session.finish_generation(request, Err(GenerateError::Backend("boom".to_string())));
        assert_eq!(session.last_error(), Some("boom"));
    }

    #[test]
    fn test_generating_flag_clears_when_finish_panics() {
        let logs = Rc::new(LogStore::load(Rc::new(MemoryStore::new())));
        let mut session = Session::restore(Rc::new(PanickingStore), logs);
        session.update_prompt("a neon cat");
        let request = session.begin_generation().unwrap();
        assert!(session.is_generating());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));
        }));

        assert!(result.is_err());
        assert!(!session.is_generating());
    }

    #[test]
    fn test_clear_history_removes_persisted_key() {
        let (store, mut session) = new_session();
        session.update_prompt("a neon cat");
        let request = session.begin_generation().unwrap();
        session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));
        assert!(store.get(HISTORY_KEY).unwrap().is_some());

        session.clear_history();

        assert!(session.history().is_empty());
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
        assert_eq!(
            session.logs().logs().pop().unwrap().message,
            "Generation history cleared"
        );
    }

    #[test]
    fn test_clear_history_with_failing_store() {
        let store: Rc<dyn KvStore> = Rc::new(ReadOnlyStore::default());
        let logs = Rc::new(LogStore::load(store.clone()));
        let mut session = Session::restore(store, logs);
        session.update_prompt("a neon cat");
        let request = session.begin_generation().unwrap();
        session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));
        assert_eq!(session.history().len(), 1);

        session.clear_history();

        assert!(session.history().is_empty());
        let last = session.logs().logs().pop().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.message, "Failed to clear generation history from storage");
    }

    #[test]
    fn test_history_write_failure_is_a_warning() {
        let store: Rc<dyn KvStore> = Rc::new(ReadOnlyStore::default());
        let logs = Rc::new(LogStore::load(store.clone()));
        let mut session = Session::restore(store, logs);
        session.update_prompt("a neon cat");

        let request = session.begin_generation().unwrap();
        session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.last_error(), None);
        let warned = session
            .logs()
            .logs()
            .iter()
            .any(|entry| entry.level == LogLevel::Warn);
        assert!(warned);
    }

    #[test]
    fn test_restore_reads_persisted_history() {
        let (store, mut session) = new_session();
        session.update_prompt("kept across restarts");
        let request = session.begin_generation().unwrap();
        session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));

        let logs = Rc::new(LogStore::load(store.clone()));
        let restored = Session::restore(store, logs);

        assert_eq!(restored.history(), session.history());
        assert_eq!(restored.stats().total, 1);
        assert_eq!(
            restored.stats().last_generated,
            Some(session.history()[0].timestamp)
        );
    }

    #[test]
    fn test_corrupt_history_starts_empty() {
        let store = Rc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "[{\"id\": 3").unwrap();
        let logs = Rc::new(LogStore::load(store.clone()));

        let session = Session::restore(store, logs);

        assert!(session.history().is_empty());
        assert_eq!(session.logs().logs()[0].level, LogLevel::Error);
    }

    #[test]
    fn test_download_outcomes() {
        let (_store, mut session) = new_session();
        assert!(session.download_request(0).is_none());

        session.update_prompt("a neon cat");
        let request = session.begin_generation().unwrap();
        session.finish_generation(request, Ok("https://example.test/a.jpg".to_string()));
        let download = session.download_request(0).unwrap();
        assert_eq!(download.url, "https://example.test/a.jpg");

        session.finish_download(&download, Err(DownloadError::Cancelled));
        assert_eq!(session.last_error(), None);

        session.finish_download(&download, Err(DownloadError::Fetch("404".to_string())));
        assert_eq!(session.last_error(), Some("failed to fetch image: 404"));
        assert_eq!(session.logs().logs().pop().unwrap().message, "Download failed");
    }
}
