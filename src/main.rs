use iced::widget::{button, column, container, scrollable, text};
use iced::{Alignment, Element, Length, Task, Theme};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod backend;
mod config;
mod error;
mod state;
mod ui;

use backend::download::{self, DownloadRequest};
use backend::{run_generation, GenerationRequest, ImageBackend, PlaceholderBackend};
use config::AppConfig;
use error::{DownloadError, GenerateError};
use state::data::Setting;
use state::logs::{metadata, LogStore};
use state::session::Session;
use state::store::{KvStore, MemoryStore, SqliteStore};
use ui::boundary::ErrorBoundary;
use ui::thumbnails::Thumbnails;

/// Console filter used when `RUST_LOG` is unset. Diagnostic debug entries
/// are mirrored too.
const DEFAULT_LOG_FILTER: &str = "info,bando_fi::diagnostics=debug";

/// Main application state
struct BandoFi {
    /// Prompt, settings and generation history
    session: Session,
    /// Diagnostic log, shared with the session
    logs: Rc<LogStore>,
    /// Local key-value store, shared with the session and the log
    store: Rc<dyn KvStore>,
    /// Image-generation boundary
    backend: Arc<dyn ImageBackend>,
    /// Catches faults in the studio region
    boundary: ErrorBoundary,
    /// Fetched previews for the image list
    thumbnails: Thumbnails,
    show_diagnostics: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Prompt text edited
    PromptChanged(String),
    /// One of the generation sliders moved
    SettingChanged(Setting),
    /// User clicked "Generate Image"
    Generate,
    /// Background generation completed
    GenerationFinished(GenerationRequest, Result<String, GenerateError>),
    /// User clicked "Clear History"
    ClearHistory,
    /// User clicked "Download" on the record at this index
    Download(usize),
    /// Background download completed
    DownloadFinished(DownloadRequest, Result<PathBuf, DownloadError>),
    /// Preview bytes for the record with this id arrived
    ThumbnailLoaded(String, Result<Vec<u8>, DownloadError>),
    ToggleDiagnostics,
    ExportLogs,
    LogsExported(Result<Option<PathBuf>, DownloadError>),
    ClearLogs,
    /// User clicked "Try Again" on the error boundary
    TryAgain,
}

impl BandoFi {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::load();
        let store = open_store(&config);
        let logs = Rc::new(LogStore::load(store.clone()));

        if let Some(fault) = ErrorBoundary::last_fault(store.as_ref()) {
            tracing::info!("Last recorded fault ({}): {}", fault.timestamp, fault.error);
        }

        let session = Session::restore(store.clone(), logs.clone());
        let backend: Arc<dyn ImageBackend> = Arc::new(PlaceholderBackend::new(
            config.generation_latency(),
            config.placeholder_base_url.clone(),
        ));

        logs.info(
            "BandoFi-Ai application initialized",
            Some(metadata([("images", session.history().len().into())])),
        );

        let mut app = BandoFi {
            session,
            logs,
            store,
            backend,
            boundary: ErrorBoundary::new(),
            thumbnails: Thumbnails::new(),
            show_diagnostics: false,
        };
        let task = app.load_thumbnails();
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        // History may have changed, fetch previews for new records
        Task::batch([task, self.load_thumbnails()])
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TryAgain => {
                self.boundary.reset();
                self.logs.info("Error boundary reset", None);
                Task::none()
            }
            Message::ToggleDiagnostics => {
                self.show_diagnostics = !self.show_diagnostics;
                Task::none()
            }
            Message::ExportLogs => match self.logs.export_logs() {
                Ok(contents) => Task::perform(download::save_log_export(contents), Message::LogsExported),
                Err(err) => {
                    self.logs.error(
                        "Failed to export logs",
                        Some(metadata([("error", err.to_string().into())])),
                    );
                    Task::none()
                }
            },
            Message::LogsExported(result) => {
                match result {
                    Ok(Some(path)) => self.logs.info(
                        "Logs exported",
                        Some(metadata([("path", path.display().to_string().into())])),
                    ),
                    Ok(None) => {}
                    Err(err) => self.logs.error(
                        "Failed to export logs",
                        Some(metadata([("error", err.to_string().into())])),
                    ),
                }
                Task::none()
            }
            Message::ClearLogs => {
                self.logs.clear_logs();
                Task::none()
            }
            Message::ThumbnailLoaded(id, result) => {
                if let Err(err) = &result {
                    self.logs.warn(
                        "Failed to load image preview",
                        Some(metadata([
                            ("imageId", id.as_str().into()),
                            ("error", err.to_string().into()),
                        ])),
                    );
                }
                self.thumbnails.finish(&id, result);
                Task::none()
            }
            studio_message => {
                // Everything touching the session runs inside the error boundary
                let context = format!("while handling {studio_message:?}");
                let session = &mut self.session;
                let backend = &self.backend;
                self.boundary
                    .guard(&context, self.store.as_ref(), &self.logs, || {
                        update_studio(session, backend, studio_message)
                    })
                    .unwrap_or_else(Task::none)
            }
        }
    }

    /// Start fetching previews for records that have none yet
    fn load_thumbnails(&mut self) -> Task<Message> {
        let pending = self.thumbnails.sync(self.session.history());
        Task::batch(pending.into_iter().map(|(id, url)| {
            Task::perform(
                async move {
                    let result = download::fetch_image(&url).await;
                    (id, result)
                },
                |(id, result)| Message::ThumbnailLoaded(id, result),
            )
        }))
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let region = if self.boundary.has_error() {
            self.boundary.view()
        } else {
            self.boundary.render(
                "while rendering the studio",
                self.store.as_ref(),
                &self.logs,
                || ui::studio::view(&self.session, &self.thumbnails),
            )
        };

        let diagnostics_label = if self.show_diagnostics {
            "Hide Diagnostics"
        } else {
            "Show Diagnostics"
        };

        let mut content = column![
            text("BandoFi-Ai").size(48),
            text("Advanced Image Generation Platform").size(16),
            region,
            button(diagnostics_label).on_press(Message::ToggleDiagnostics),
            text(footer()).size(12),
        ]
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        if self.show_diagnostics {
            content = content.push(ui::diagnostics::view(&self.logs));
        }

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn footer() -> String {
    format!(
        "BandoFi-Ai v{} | Production-Grade Image Generation",
        env!("CARGO_PKG_VERSION")
    )
}

/// Apply a message that belongs to the studio region
fn update_studio(
    session: &mut Session,
    backend: &Arc<dyn ImageBackend>,
    message: Message,
) -> Task<Message> {
    match message {
        Message::PromptChanged(prompt) => {
            session.update_prompt(prompt);
            Task::none()
        }
        Message::SettingChanged(setting) => {
            session.update_setting(setting);
            Task::none()
        }
        Message::Generate => {
            let Some(request) = session.begin_generation() else {
                return Task::none();
            };

            // Launch async generation task
            let backend = backend.clone();
            Task::perform(
                async move {
                    let outcome = run_generation(backend, request.clone()).await;
                    (request, outcome)
                },
                |(request, outcome)| Message::GenerationFinished(request, outcome),
            )
        }
        Message::GenerationFinished(request, outcome) => {
            session.finish_generation(request, outcome);
            Task::none()
        }
        Message::ClearHistory => {
            session.clear_history();
            Task::none()
        }
        Message::Download(index) => {
            let Some(request) = session.download_request(index) else {
                return Task::none();
            };
            Task::perform(
                async move {
                    let result = download::save_image(request.clone()).await;
                    (request, result)
                },
                |(request, result)| Message::DownloadFinished(request, result),
            )
        }
        Message::DownloadFinished(request, result) => {
            session.finish_download(&request, result);
            Task::none()
        }
        _ => Task::none(),
    }
}

/// Open the SQLite store, falling back to memory so the studio still works
fn open_store(config: &AppConfig) -> Rc<dyn KvStore> {
    let Some(path) = config.database_path() else {
        tracing::warn!("Could not determine data directory, history will not persist");
        return Rc::new(MemoryStore::new());
    };

    match SqliteStore::open(&path) {
        Ok(store) => Rc::new(store),
        Err(err) => {
            tracing::warn!(
                "Failed to open local store at {}: {}. History will not persist.",
                path.display(),
                err
            );
            Rc::new(MemoryStore::new())
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> iced::Result {
    init_tracing();
    ui::boundary::install_panic_hook();

    iced::application("BandoFi-Ai", BandoFi::update, BandoFi::view)
        .theme(BandoFi::theme)
        .centered()
        .run_with(BandoFi::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_filter_lets_diagnostic_debug_through() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_footer_names_version() {
        assert_eq!(
            footer(),
            "BandoFi-Ai v1.0.0 | Production-Grade Image Generation"
        );
    }
}
