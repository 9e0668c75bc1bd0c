// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Structured queries against a table.
//!
//! A [`Query`] is backend-neutral; [`Query::to_params`] renders it in
//! PostgREST's query-string syntax.

/// Row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
	Eq(String, String),
	Neq(String, String),
	/// Case-insensitive pattern match; `*` and `%` match any run of characters.
	Ilike(String, String),
	In(String, Vec<String>),
	IsNull(String),
	/// Any of the inner filters.
	Or(Vec<Filter>),
}

impl Filter {
	pub fn eq(column: &str, value: impl ToString) -> Self {
		Filter::Eq(column.to_string(), value.to_string())
	}

	pub fn neq(column: &str, value: impl ToString) -> Self {
		Filter::Neq(column.to_string(), value.to_string())
	}

	pub fn ilike(column: &str, pattern: impl ToString) -> Self {
		Filter::Ilike(column.to_string(), pattern.to_string())
	}

	pub fn in_list<S: ToString>(column: &str, values: &[S]) -> Self {
		Filter::In(
			column.to_string(),
			values.iter().map(ToString::to_string).collect(),
		)
	}

	pub fn is_null(column: &str) -> Self {
		Filter::IsNull(column.to_string())
	}

	/// `column.op.value` without the column, as used in a query parameter.
	fn operator(&self) -> String {
		match self {
			Filter::Eq(_, v) => format!("eq.{v}"),
			Filter::Neq(_, v) => format!("neq.{v}"),
			Filter::Ilike(_, v) => format!("ilike.{v}"),
			Filter::In(_, vs) => {
				let quoted: Vec<String> = vs.iter().map(|v| quote(v)).collect();
				format!("in.({})", quoted.join(","))
			}
			Filter::IsNull(_) => "is.null".to_string(),
			Filter::Or(_) => String::new(),
		}
	}

	fn column(&self) -> &str {
		match self {
			Filter::Eq(c, _)
			| Filter::Neq(c, _)
			| Filter::Ilike(c, _)
			| Filter::In(c, _)
			| Filter::IsNull(c) => c,
			Filter::Or(_) => "or",
		}
	}

	/// Form used inside a logical group: `column.op.value`, with values
	/// quoted when they contain reserved characters.
	fn nested(&self) -> String {
		match self {
			Filter::Eq(c, v) => format!("{c}.eq.{}", quote(v)),
			Filter::Neq(c, v) => format!("{c}.neq.{}", quote(v)),
			Filter::Ilike(c, v) => format!("{c}.ilike.{}", quote(v)),
			Filter::Or(inner) => format!("or({})", join_nested(inner)),
			other => format!("{}.{}", other.column(), other.operator()),
		}
	}

	/// Query-string parameter for this filter.
	pub fn to_param(&self) -> (String, String) {
		match self {
			Filter::Or(inner) => ("or".to_string(), format!("({})", join_nested(inner))),
			other => (other.column().to_string(), other.operator()),
		}
	}
}

fn join_nested(filters: &[Filter]) -> String {
	filters
		.iter()
		.map(Filter::nested)
		.collect::<Vec<_>>()
		.join(",")
}

fn quote(value: &str) -> String {
	if value.contains([',', '(', ')', '"', ':', '\\']) || value.contains(' ') {
		format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
	} else {
		value.to_string()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
	pub column: String,
	pub ascending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
	pub offset: u64,
	pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
	pub table: String,
	pub select: String,
	pub filters: Vec<Filter>,
	pub order: Vec<Order>,
	pub range: Option<Range>,
	/// Ask for the total number of matching rows.
	pub count: bool,
}

impl Query {
	pub fn table(table: &str) -> Self {
		Self {
			table: table.to_string(),
			select: "*".to_string(),
			filters: Vec::new(),
			order: Vec::new(),
			range: None,
			count: false,
		}
	}

	pub fn select(mut self, columns: &str) -> Self {
		self.select = columns.to_string();
		self
	}

	pub fn filter(mut self, filter: Filter) -> Self {
		self.filters.push(filter);
		self
	}

	pub fn order(mut self, column: &str, ascending: bool) -> Self {
		self.order.push(Order {
			column: column.to_string(),
			ascending,
		});
		self
	}

	pub fn range(mut self, offset: u64, limit: u64) -> Self {
		self.range = Some(Range { offset, limit });
		self
	}

	pub fn with_count(mut self) -> Self {
		self.count = true;
		self
	}

	pub fn to_params(&self) -> Vec<(String, String)> {
		let mut params = vec![("select".to_string(), self.select.clone())];
		params.extend(self.filters.iter().map(Filter::to_param));
		if !self.order.is_empty() {
			let order = self
				.order
				.iter()
				.map(|o| {
					format!(
						"{}.{}",
						o.column,
						if o.ascending { "asc" } else { "desc" }
					)
				})
				.collect::<Vec<_>>()
				.join(",");
			params.push(("order".to_string(), order));
		}
		if let Some(range) = self.range {
			params.push(("offset".to_string(), range.offset.to_string()));
			params.push(("limit".to_string(), range.limit.to_string()));
		}
		params
	}
}
