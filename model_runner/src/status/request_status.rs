//! The terminal/in-progress status vocabulary shared by both status monitors.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
	Success,
	Partial,
	Failed,
	InProgress,
}

impl fmt::Display for RequestStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RequestStatus::Success => "SUCCESS",
			RequestStatus::Partial => "PARTIAL",
			RequestStatus::Failed => "FAILED",
			RequestStatus::InProgress => "IN_PROGRESS",
		};
		f.write_str(name)
	}
}
