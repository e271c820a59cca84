//! Explicit id-to-descriptor registry.

// self
use crate::{_prelude::*, error::RegistryError, function::FunctionDescriptor};

/// Number of functions registered under one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
	/// Category label.
	pub name: String,
	/// Registered functions in the category.
	pub count: usize,
}

/// Explicit id-to-descriptor map, built once at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
	functions: BTreeMap<String, FunctionDescriptor>,
}
impl FunctionRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a descriptor, rejecting duplicate identifiers.
	pub fn register(&mut self, descriptor: FunctionDescriptor) -> Result<(), RegistryError> {
		if self.functions.contains_key(&descriptor.id) {
			return Err(RegistryError::DuplicateFunction { id: descriptor.id });
		}

		self.functions.insert(descriptor.id.clone(), descriptor);

		Ok(())
	}

	/// Builder-style [`register`](Self::register).
	pub fn with(mut self, descriptor: FunctionDescriptor) -> Result<Self, RegistryError> {
		self.register(descriptor)?;

		Ok(self)
	}

	/// Returns the descriptor for `id`, if registered.
	pub fn get(&self, id: &str) -> Option<&FunctionDescriptor> {
		self.functions.get(id)
	}

	/// Returns the descriptor for `id` or an error listing the registered ids.
	pub fn lookup(&self, id: &str) -> Result<&FunctionDescriptor, RegistryError> {
		self.get(id)
			.ok_or_else(|| RegistryError::UnknownFunction { id: id.to_owned(), available: self.ids() })
	}

	/// Returns `true` when `id` is registered.
	pub fn contains(&self, id: &str) -> bool {
		self.functions.contains_key(id)
	}

	/// Registered identifiers in sorted order.
	pub fn ids(&self) -> Vec<String> {
		self.functions.keys().cloned().collect()
	}

	/// Descriptors in id order, optionally restricted to one category.
	pub fn descriptors<'a>(
		&'a self,
		category: Option<&'a str>,
	) -> impl Iterator<Item = &'a FunctionDescriptor> + 'a {
		self.functions
			.values()
			.filter(move |descriptor| category.is_none_or(|c| descriptor.category == c))
	}

	/// Per-category counts in category order.
	pub fn categories(&self) -> Vec<CategoryCount> {
		let mut counts = BTreeMap::<&str, usize>::new();

		for descriptor in self.functions.values() {
			*counts.entry(descriptor.category.as_str()).or_default() += 1;
		}

		counts.into_iter().map(|(name, count)| CategoryCount { name: name.to_owned(), count }).collect()
	}

	/// Number of registered functions.
	pub fn len(&self) -> usize {
		self.functions.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.functions.is_empty()
	}
}
