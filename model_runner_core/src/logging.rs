//! Per-task structured log context.
//!
//! Spec.md §6 requires every log record to carry `job_id`/`image_id` (and, for region-scoped
//! work, `region_id`) "propagated via task-local storage: the filter reads the current task's
//! context map and stamps those keys onto the record; threads started during a task inherit
//! their starting context." `tokio::task_local!` gives us exactly that: a value scoped to the
//! current task tree, readable without threading an explicit parameter through every call.

use std::collections::BTreeMap;
use std::fmt;

tokio::task_local! {
	static LOG_CONTEXT: BTreeMap<&'static str, String>;
}

/// Runs `fut` with `job_id` (and optionally `image_id`/`region_id`) bound in the task-local log
/// context for the duration of the future, including any tasks it spawns that `.await` within
/// its scope.
pub async fn with_job_context<F, T>(job_id: &str, image_id: Option<&str>, fut: F) -> T
where
	F: std::future::Future<Output = T>,
{
	let mut ctx = BTreeMap::new();
	ctx.insert("job_id", job_id.to_string());
	if let Some(image_id) = image_id {
		ctx.insert("image_id", image_id.to_string());
	}
	LOG_CONTEXT.scope(ctx, fut).await
}

/// Runs `fut` with an additional `region_id` merged into the current log context.
pub async fn with_region_context<F, T>(region_id: &str, fut: F) -> T
where
	F: std::future::Future<Output = T>,
{
	let mut ctx = LOG_CONTEXT.try_with(Clone::clone).unwrap_or_default();
	ctx.insert("region_id", region_id.to_string());
	LOG_CONTEXT.scope(ctx, fut).await
}

/// Formats the current task's log context as `key=value` pairs, e.g. `job_id=abc image_id=xyz`.
/// Returns an empty string outside of a `with_job_context` scope.
pub fn current_context_string() -> String {
	LOG_CONTEXT
		.try_with(|ctx| {
			ctx.iter()
				.map(|(k, v)| format!("{k}={v}"))
				.collect::<Vec<_>>()
				.join(" ")
		})
		.unwrap_or_default()
}

/// A `log::Log` wrapper that prefixes every record with the current task's log context.
///
/// Install with `log::set_boxed_logger` in the binary entry point (out of scope for this crate,
/// which only provides the mechanism).
pub struct ContextLogger<L> {
	inner: L,
}

impl<L> ContextLogger<L> {
	pub fn new(inner: L) -> Self {
		Self { inner }
	}
}

impl<L: log::Log> log::Log for ContextLogger<L> {
	fn enabled(&self, metadata: &log::Metadata) -> bool {
		self.inner.enabled(metadata)
	}

	fn log(&self, record: &log::Record) {
		let context = current_context_string();
		if context.is_empty() {
			self.inner.log(record);
			return;
		}
		let args = format!("[{context}] {}", record.args());
		let record = log::Record::builder()
			.args(format_args!("{args}"))
			.metadata(record.metadata().clone())
			.module_path(record.module_path())
			.file(record.file())
			.line(record.line())
			.build();
		self.inner.log(&record);
	}

	fn flush(&self) {
		self.inner.flush();
	}
}

impl<L> fmt::Debug for ContextLogger<L> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContextLogger").finish_non_exhaustive()
	}
}
