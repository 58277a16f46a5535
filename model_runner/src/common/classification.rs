//! Security classification banner construction, attached to every feature collection a Sink
//! receives.

use crate::errors::InvalidClassificationException;
use serde_json::{Map, Value};
use std::fmt;

/// Classification level, ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClassificationLevel {
	Unclassified,
	Confidential,
	Secret,
	TopSecret,
}

impl ClassificationLevel {
	/// The uppercase, space-separated display form used in banners (`TOP_SECRET` → `TOP SECRET`).
	pub fn display(self) -> &'static str {
		match self {
			ClassificationLevel::Unclassified => "UNCLASSIFIED",
			ClassificationLevel::Confidential => "CONFIDENTIAL",
			ClassificationLevel::Secret => "SECRET",
			ClassificationLevel::TopSecret => "TOP SECRET",
		}
	}

	fn parse(display: &str) -> Option<Self> {
		match display.to_uppercase().as_str() {
			"UNCLASSIFIED" => Some(ClassificationLevel::Unclassified),
			"CONFIDENTIAL" => Some(ClassificationLevel::Confidential),
			"SECRET" => Some(ClassificationLevel::Secret),
			"TOP SECRET" | "TOP_SECRET" => Some(ClassificationLevel::TopSecret),
			_ => None,
		}
	}
}

impl fmt::Display for ClassificationLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.display())
	}
}

/// A security classification and its derived banner string, attached to a feature collection
/// before it is handed to a Sink.
///
/// Construction enforces: `UNCLASSIFIED` carries no caveats; every level above `UNCLASSIFIED`
/// must carry a non-empty `releasability`.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
	pub level: ClassificationLevel,
	pub caveats: Option<Vec<String>>,
	pub releasability: Option<String>,
	banner: String,
}

impl Classification {
	pub fn new(
		level: ClassificationLevel,
		caveats: Option<Vec<String>>,
		releasability: Option<String>,
	) -> Result<Self, InvalidClassificationException> {
		let caveats = caveats.filter(|c| !c.is_empty()).map(|c| c.into_iter().map(|s| s.to_uppercase()).collect::<Vec<_>>());
		let releasability = releasability.filter(|r| !r.is_empty()).map(|r| r.to_uppercase());

		if level == ClassificationLevel::Unclassified && caveats.is_some() {
			return Err(InvalidClassificationException(
				"UNCLASSIFIED classifications may not carry caveats".to_string(),
			));
		}
		if level != ClassificationLevel::Unclassified && releasability.is_none() {
			return Err(InvalidClassificationException(format!(
				"{} classifications require a releasability marking",
				level.display()
			)));
		}

		let mut parts = vec![level.display().to_string()];
		if let Some(caveats) = &caveats {
			parts.push(caveats.join("/"));
		}
		if let Some(releasability) = &releasability {
			parts.push(releasability.clone());
		}
		let banner = parts.join("//");

		Ok(Self { level, caveats, releasability, banner })
	}

	/// The constructed banner string, `LEVEL[//CAVEAT/...][//RELEASABILITY]`.
	pub fn banner(&self) -> &str {
		&self.banner
	}

	/// Serializes to the same shape `from_dict` accepts: `level`, `caveats`, `releasability`,
	/// `classification` (the computed banner).
	pub fn asdict(&self) -> Value {
		let mut map = Map::new();
		map.insert("level".to_string(), Value::from(self.level.display()));
		map.insert(
			"caveats".to_string(),
			match &self.caveats {
				Some(c) => Value::from(c.clone()),
				None => Value::Null,
			},
		);
		map.insert(
			"releasability".to_string(),
			match &self.releasability {
				Some(r) => Value::from(r.clone()),
				None => Value::Null,
			},
		);
		map.insert("classification".to_string(), Value::from(self.banner.clone()));
		Value::Object(map)
	}

	pub fn from_dict(value: &Value) -> Result<Self, InvalidClassificationException> {
		let level_str = value
			.get("level")
			.and_then(Value::as_str)
			.ok_or_else(|| InvalidClassificationException("missing classification level".to_string()))?;
		let level = ClassificationLevel::parse(level_str)
			.ok_or_else(|| InvalidClassificationException(format!("unrecognized classification level: {level_str}")))?;
		let caveats = value
			.get("caveats")
			.and_then(Value::as_array)
			.map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect());
		let releasability = value.get("releasability").and_then(Value::as_str).map(str::to_string);
		Classification::new(level, caveats, releasability)
	}
}
