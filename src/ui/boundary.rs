/// Error boundary around the studio region
///
/// Faults raised while the studio renders or handles a message are caught
/// here, written to the diagnostic log and persisted under `lastError`, and
/// the studio is swapped for a recovery panel until the user presses "Try Again".
///
/// Rendering only has `&self`, so the fault lives in a `RefCell`.

use chrono::{DateTime, Utc};
use iced::widget::{button, column, container, scrollable, text};
use iced::{Color, Element, Length};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use crate::state::logs::{metadata, LogStore};
use crate::state::store::{KvStore, LAST_ERROR_KEY};
use crate::Message;

thread_local! {
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record a backtrace for every panic, then defer to the default hook
pub fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let trace = Backtrace::force_capture().to_string();
        LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
        default_hook(info);
    }));
}

fn take_trace() -> Option<String> {
    LAST_TRACE.with(|slot| slot.borrow_mut().take())
}

/// What was caught, as persisted under `lastError`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaultReport {
    pub error: String,
    /// Backtrace of the panic, or the message being handled when none was captured
    pub error_info: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    fault: RefCell<Option<FaultReport>>,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fault(&self) -> Option<FaultReport> {
        self.fault.borrow().clone()
    }

    pub fn has_error(&self) -> bool {
        self.fault.borrow().is_some()
    }

    /// Run `f`, catching any panic it raises.
    /// Returns `None` when a fault was captured.
    pub fn guard<R>(
        &self,
        context: &str,
        store: &dyn KvStore,
        logs: &LogStore,
        f: impl FnOnce() -> R,
    ) -> Option<R> {
        take_trace();

        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let report = FaultReport {
                    error: panic_message(payload.as_ref()),
                    error_info: take_trace().unwrap_or_else(|| context.to_string()),
                    timestamp: Utc::now(),
                };
                self.capture(report, store, logs);
                None
            }
        }
    }

    /// Render a region, showing the recovery panel if rendering panics
    pub fn render<'a>(
        &self,
        context: &str,
        store: &dyn KvStore,
        logs: &LogStore,
        view: impl FnOnce() -> Element<'a, Message>,
    ) -> Element<'a, Message> {
        match self.guard(context, store, logs, view) {
            Some(element) => element,
            None => self.view(),
        }
    }

    /// Log and persist a fault, then enter the faulted state
    pub fn capture(&self, report: FaultReport, store: &dyn KvStore, logs: &LogStore) {
        logs.error(
            "Error caught by error boundary",
            Some(metadata([("error", report.error.as_str().into())])),
        );

        let saved = serde_json::to_string(&report)
            .map_err(crate::error::StoreError::from)
            .and_then(|json| store.set(LAST_ERROR_KEY, &json));
        if let Err(err) = saved {
            logs.warn(
                "Failed to save error to storage",
                Some(metadata([("error", err.to_string().into())])),
            );
        }

        self.fault.replace(Some(report));
    }

    /// "Try Again": drop the fault and show the studio again
    pub fn reset(&self) {
        self.fault.replace(None);
    }

    /// The most recently persisted fault, if any
    pub fn last_fault(store: &dyn KvStore) -> Option<FaultReport> {
        let json = store.get(LAST_ERROR_KEY).ok()??;
        serde_json::from_str(&json).ok()
    }

    /// Recovery panel shown in place of the faulted region
    pub fn view(&self) -> Element<'static, Message> {
        let Some(fault) = self.fault() else {
            return column![].into();
        };

        let details = scrollable(text(fault.error_info).size(12)).height(Length::Fixed(240.0));

        container(
            column![
                text("Something went wrong.")
                    .size(28)
                    .color(Color::from_rgb(1.0, 0.4, 0.7)),
                text(fault.error).size(16),
                details,
                button("Try Again").on_press(Message::TryAgain).padding(10),
            ]
            .spacing(16),
        )
        .padding(20)
        .width(Length::Fill)
        .into()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown fault".to_string()
    }
}
