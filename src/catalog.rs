//! The data collection served by the API.
//!
//! Items live in memory for the lifetime of the process. Every mutation, including id
//! assignment, happens under one write lock.

// self
use crate::_prelude::*;

/// Category used when a create request names none.
pub const DEFAULT_CATEGORY: &str = "General";
/// Creator recorded when the caller has no email or username claim.
pub const UNKNOWN_CREATOR: &str = "Unknown";

/// One entry of the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataItem {
	/// Unique identifier.
	pub id: u64,
	/// Title.
	pub title: String,
	/// Free-form description.
	pub description: String,
	/// Category label.
	pub category: String,
	/// Email or username of the creator; seeded items have none.
	pub created_by: Option<String>,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl DataItem {
	/// Case-insensitive substring match against title, description, and category.
	pub fn matches(&self, needle: &str) -> bool {
		let needle = needle.to_lowercase();

		[&self.title, &self.description, &self.category]
			.into_iter()
			.any(|field| field.to_lowercase().contains(&needle))
	}
}

/// Body of a create request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDataItem {
	/// Required title; absent, `null`, and blank are all rejected on create.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	/// Defaults to an empty string.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Defaults to [`DEFAULT_CATEGORY`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
}
impl NewDataItem {
	/// Request with only a title.
	pub fn titled(title: impl Into<String>) -> Self {
		Self { title: Some(title.into()), ..Default::default() }
	}
}

/// Lock-guarded collection of [`DataItem`]s.
#[derive(Debug, Default)]
pub struct DataStore {
	items: RwLock<Vec<DataItem>>,
}
impl DataStore {
	/// Collection holding `items`.
	pub fn new(items: Vec<DataItem>) -> Self {
		Self { items: RwLock::new(items) }
	}

	/// Collection seeded with the five sample items.
	pub fn with_samples() -> Self {
		let now = OffsetDateTime::now_utc();
		let items = [
			("Azure AD Integration", "Secure authentication with Azure AD", "Security"),
			("RESTful API Design", "Best practices for API development", "Development"),
			("Cloud Architecture", "Scalable cloud solutions with Azure", "Architecture"),
			("Microservices Pattern", "Building distributed systems", "Architecture"),
			("DevOps Pipeline", "CI/CD with Azure DevOps", "DevOps"),
		]
		.into_iter()
		.zip(1..)
		.map(|((title, description, category), id)| DataItem {
			id,
			title: title.into(),
			description: description.into(),
			category: category.into(),
			created_by: None,
			created_at: now,
		})
		.collect();

		Self::new(items)
	}

	/// Items matching `search`, or every item when it is absent or blank.
	pub fn search(&self, search: Option<&str>) -> Vec<DataItem> {
		let items = self.items.read();

		match search.map(str::trim).filter(|needle| !needle.is_empty()) {
			Some(needle) => items.iter().filter(|item| item.matches(needle)).cloned().collect(),
			None => items.clone(),
		}
	}

	/// Item with `id`.
	pub fn get(&self, id: u64) -> Result<DataItem> {
		self.items.read().iter().find(|item| item.id == id).cloned().ok_or(Error::NotFound { id })
	}

	/// Validates and appends a new item with the next id (current maximum + 1).
	///
	/// A blank title fails with [`Error::ValidationFailed`]; an empty collection fails with
	/// [`Error::EmptyCollection`]. Neither mutates the collection.
	pub fn create(&self, request: NewDataItem, creator: Option<&str>) -> Result<DataItem> {
		let Some(title) = request.title.filter(|title| !title.trim().is_empty()) else {
			return Err(Error::ValidationFailed { reason: "Title is required".into() });
		};

		let mut items = self.items.write();
		let id = items.iter().map(|item| item.id).max().ok_or(Error::EmptyCollection)? + 1;
		let item = DataItem {
			id,
			title,
			description: request.description.unwrap_or_default(),
			category: request.category.unwrap_or_else(|| DEFAULT_CATEGORY.into()),
			created_by: Some(creator.unwrap_or(UNKNOWN_CREATOR).to_owned()),
			created_at: OffsetDateTime::now_utc(),
		};

		items.push(item.clone());

		Ok(item)
	}

	/// Removes and returns the item with `id`.
	pub fn delete(&self, id: u64) -> Result<DataItem> {
		let mut items = self.items.write();
		let position = items.iter().position(|item| item.id == id).ok_or(Error::NotFound { id })?;

		Ok(items.remove(position))
	}

	/// Number of items.
	pub fn len(&self) -> usize {
		self.items.read().len()
	}

	/// Whether the collection is empty.
	pub fn is_empty(&self) -> bool {
		self.items.read().is_empty()
	}
}
