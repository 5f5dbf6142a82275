//! Host-side session hooks: notifications, logout routing, and the loading indicator.
//!
//! The pipeline never renders UI. It reports user-visible events through [`SessionHooks`] and
//! leaves presentation (toasts, modals, navigation timers) to the host.

// std
use std::time::Duration as StdDuration;
// self
use crate::_prelude::*;

/// Severity of a transient notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
	/// Request failed; show an error toast.
	Error,
}

/// Transient notification for user-visible failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
	/// Severity.
	pub level: NoticeLevel,
	/// Message shown to the user.
	pub message: String,
}

/// Blocking logout prompt with a forced-navigation fallback.
///
/// Hosts show a modal with `title` and `content`; once the user acknowledges it (or
/// `fallback_delay` elapses without acknowledgment) they navigate to `redirect`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoutNotice {
	/// Modal title.
	pub title: String,
	/// Modal body.
	pub content: String,
	/// Login entry point.
	pub redirect: String,
	/// Delay before forced navigation.
	pub fallback_delay: StdDuration,
	/// What ended the session.
	pub reason: LogoutReason,
}

/// Why the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
	/// Server reported the caller is not authenticated.
	NotAuthenticated,
	/// Token refresh failed or no refresh token was stored.
	RefreshFailed,
}

/// Host callbacks invoked by the pipeline. Every method defaults to a no-op.
pub trait SessionHooks
where
	Self: Send + Sync,
{
	/// Shows a transient notification.
	fn notify(&self, notice: Notice) {
		let _ = notice;
	}

	/// Session ended; the token store has already been cleared.
	fn logged_out(&self, notice: LogoutNotice) {
		let _ = notice;
	}

	/// Shows (`Some(text)`) or hides (`None`) the loading indicator.
	fn loading(&self, text: Option<&str>) {
		let _ = text;
	}
}

/// Hooks that ignore every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;
impl SessionHooks for NoopHooks {}

/// Hooks that record every event, for tests and diagnostics.
#[derive(Clone, Debug, Default)]
pub struct RecordingHooks {
	notices: Arc<Mutex<Vec<Notice>>>,
	logouts: Arc<Mutex<Vec<LogoutNotice>>>,
	loading: Arc<Mutex<Vec<Option<String>>>>,
}
impl RecordingHooks {
	/// Notifications seen so far.
	pub fn notices(&self) -> Vec<Notice> {
		self.notices.lock().clone()
	}

	/// Logout prompts seen so far.
	pub fn logouts(&self) -> Vec<LogoutNotice> {
		self.logouts.lock().clone()
	}

	/// Loading indicator transitions seen so far.
	pub fn loading_events(&self) -> Vec<Option<String>> {
		self.loading.lock().clone()
	}
}
impl SessionHooks for RecordingHooks {
	fn notify(&self, notice: Notice) {
		self.notices.lock().push(notice);
	}

	fn logged_out(&self, notice: LogoutNotice) {
		self.logouts.lock().push(notice);
	}

	fn loading(&self, text: Option<&str>) {
		self.loading.lock().push(text.map(str::to_owned));
	}
}
