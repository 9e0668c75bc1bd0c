// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`DataStore`] for tests.
//!
//! Supports the filter set of [`Filter`], ordering, paging, counting and
//! one level of embedding (`*, roles(name)`) through registered relations.
//! Inserted rows get an integer `id` and a `created_at` when missing.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{DbError, Result};
use crate::query::{Filter, Query};
use crate::store::{DataStore, Page};

struct Relation {
	table: &'static str,
	embed: &'static str,
	local: &'static str,
	foreign: &'static str,
}

#[derive(Default)]
struct State {
	tables: HashMap<String, Vec<Value>>,
	failing: HashSet<String>,
	rpcs: Vec<(String, Value)>,
	next_id: u64,
}

pub struct MemoryStore {
	state: Mutex<State>,
	relations: Vec<Relation>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

fn lock(m: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
	m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => "null".to_string(),
		other => other.to_string(),
	}
}

/// `*`/`%` wildcard match, case-insensitive.
fn ilike(value: &str, pattern: &str) -> bool {
	let value: Vec<char> = value.to_lowercase().chars().collect();
	let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

	let (mut v, mut p) = (0, 0);
	let (mut star, mut mark) = (None, 0);
	while v < value.len() {
		if p < pattern.len() && (pattern[p] == '*' || pattern[p] == '%') {
			star = Some(p);
			mark = v;
			p += 1;
		} else if p < pattern.len() && pattern[p] == value[v] {
			v += 1;
			p += 1;
		} else if let Some(s) = star {
			p = s + 1;
			mark += 1;
			v = mark;
		} else {
			return false;
		}
	}
	pattern[p..].iter().all(|c| *c == '*' || *c == '%')
}

fn field(row: &Value, column: &str) -> Value {
	row.get(column).cloned().unwrap_or(Value::Null)
}

fn matches(row: &Value, filter: &Filter) -> bool {
	let col = |c: &String| field(row, c);
	match filter {
		Filter::Eq(c, v) => !col(c).is_null() && text(&col(c)) == *v,
		Filter::Neq(c, v) => !col(c).is_null() && text(&col(c)) != *v,
		Filter::Ilike(c, p) => match col(c) {
			Value::Null => false,
			f => ilike(&text(&f), p),
		},
		Filter::In(c, vs) => !col(c).is_null() && vs.contains(&text(&col(c))),
		Filter::IsNull(c) => col(c).is_null(),
		Filter::Or(inner) => inner.iter().any(|f| matches(row, f)),
	}
}

fn compare(a: &Value, b: &Value) -> Ordering {
	match (a, b) {
		(Value::Null, Value::Null) => Ordering::Equal,
		// Postgres sorts nulls last in ascending order.
		(Value::Null, _) => Ordering::Greater,
		(_, Value::Null) => Ordering::Less,
		(Value::Number(x), Value::Number(y)) => x
			.as_f64()
			.partial_cmp(&y.as_f64())
			.unwrap_or(Ordering::Equal),
		(x, y) => text(x).cmp(&text(y)),
	}
}

/// Splits `"*, roles(name, colour)"` into plain columns and embeds.
fn parse_select(select: &str) -> (Vec<String>, Vec<(String, Vec<String>)>) {
	let mut columns = Vec::new();
	let mut embeds = Vec::new();
	let mut depth = 0;
	let mut current = String::new();
	let mut parts = Vec::new();
	for c in select.chars() {
		match c {
			'(' => {
				depth += 1;
				current.push(c);
			}
			')' => {
				depth -= 1;
				current.push(c);
			}
			',' if depth == 0 => parts.push(std::mem::take(&mut current)),
			_ => current.push(c),
		}
	}
	parts.push(current);

	for part in parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
		match part.split_once('(') {
			Some((name, rest)) => {
				let inner = rest.trim_end_matches(')');
				embeds.push((
					name.trim().to_string(),
					inner.split(',').map(|c| c.trim().to_string()).collect(),
				));
			}
			None => columns.push(part.to_string()),
		}
	}
	(columns, embeds)
}

fn project(row: &Value, columns: &[String]) -> Map<String, Value> {
	let Some(object) = row.as_object() else {
		return Map::new();
	};
	if columns.iter().any(|c| c == "*") {
		return object.clone();
	}
	columns
		.iter()
		.map(|c| (c.clone(), object.get(c).cloned().unwrap_or(Value::Null)))
		.collect()
}

impl MemoryStore {
	/// A store with the relations Steward embeds: `profiles -> roles` and
	/// `logs -> profiles`.
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State::default()),
			relations: vec![
				Relation {
					table: "profiles",
					embed: "roles",
					local: "role_id",
					foreign: "id",
				},
				Relation {
					table: "logs",
					embed: "profiles",
					local: "user_id",
					foreign: "id",
				},
			],
		}
	}

	/// Inserts rows directly, bypassing failure injection. Later inserts get
	/// ids above any seeded integer id.
	pub fn seed(&self, table: &str, rows: Vec<Value>) {
		let mut state = lock(&self.state);
		let highest = rows
			.iter()
			.filter_map(|r| r.get("id").and_then(Value::as_u64))
			.max()
			.unwrap_or(0);
		state.next_id = state.next_id.max(highest);
		state.tables.entry(table.to_string()).or_default().extend(rows);
	}

	pub fn rows(&self, table: &str) -> Vec<Value> {
		lock(&self.state)
			.tables
			.get(table)
			.cloned()
			.unwrap_or_default()
	}

	/// Makes every operation on `table` (or the RPC named `table`) fail.
	pub fn fail(&self, table: &str) {
		lock(&self.state).failing.insert(table.to_string());
	}

	pub fn rpc_calls(&self) -> Vec<(String, Value)> {
		lock(&self.state).rpcs.clone()
	}

	fn check(&self, state: &State, name: &str) -> Result<()> {
		if state.failing.contains(name) {
			return Err(DbError::Rejected {
				status: 500,
				message: format!("{name} unavailable"),
			});
		}
		Ok(())
	}

	fn embed(&self, state: &State, table: &str, row: &Value, name: &str, columns: &[String]) -> Value {
		let Some(relation) = self
			.relations
			.iter()
			.find(|r| r.table == table && r.embed == name)
		else {
			return Value::Null;
		};
		let key = row.get(relation.local).cloned().unwrap_or(Value::Null);
		if key.is_null() {
			return Value::Null;
		}
		state
			.tables
			.get(relation.embed)
			.and_then(|rows| {
				rows.iter()
					.find(|r| r.get(relation.foreign).map(text) == Some(text(&key)))
			})
			.map(|r| Value::Object(project(r, columns)))
			.unwrap_or(Value::Null)
	}
}

#[async_trait]
impl DataStore for MemoryStore {
	async fn select(&self, query: &Query) -> Result<Page> {
		let state = lock(&self.state);
		self.check(&state, &query.table)?;

		let mut rows: Vec<Value> = state
			.tables
			.get(&query.table)
			.map(|rows| {
				rows.iter()
					.filter(|r| query.filters.iter().all(|f| matches(r, f)))
					.cloned()
					.collect()
			})
			.unwrap_or_default();

		rows.sort_by(|a, b| {
			for order in &query.order {
				let null = Value::Null;
				let x = a.get(&order.column).unwrap_or(&null);
				let y = b.get(&order.column).unwrap_or(&null);
				let ord = if order.ascending {
					compare(x, y)
				} else {
					compare(y, x)
				};
				if ord != Ordering::Equal {
					return ord;
				}
			}
			Ordering::Equal
		});

		let total = query.count.then_some(rows.len() as u64);
		if let Some(range) = query.range {
			rows = rows
				.into_iter()
				.skip(range.offset as usize)
				.take(range.limit as usize)
				.collect();
		}

		let (columns, embeds) = parse_select(&query.select);
		let rows = rows
			.iter()
			.map(|row| {
				let mut out = project(row, &columns);
				for (name, cols) in &embeds {
					out.insert(name.clone(), self.embed(&state, &query.table, row, name, cols));
				}
				Value::Object(out)
			})
			.collect();

		Ok(Page { rows, total })
	}

	async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>> {
		let mut state = lock(&self.state);
		self.check(&state, table)?;

		let Value::Object(mut object) = row else {
			return Err(DbError::Internal("row must be an object".to_string()));
		};
		if !object.contains_key("id") {
			state.next_id += 1;
			object.insert("id".to_string(), Value::from(state.next_id));
		}
		if !object.contains_key("created_at") {
			object.insert(
				"created_at".to_string(),
				Value::String(chrono::Utc::now().to_rfc3339()),
			);
		}
		let row = Value::Object(object);
		let rows = state.tables.entry(table.to_string()).or_default();
		let id = row.get("id").map(text);
		if rows.iter().any(|r| r.get("id").map(text) == id) {
			return Err(DbError::Conflict(format!("duplicate id in {table}")));
		}
		rows.push(row.clone());
		Ok(vec![row])
	}

	async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
		let mut state = lock(&self.state);
		self.check(&state, table)?;

		let Some(patch) = patch.as_object() else {
			return Err(DbError::Internal("patch must be an object".to_string()));
		};
		let mut updated = Vec::new();
		if let Some(rows) = state.tables.get_mut(table) {
			for row in rows.iter_mut().filter(|r| filters.iter().all(|f| matches(r, f))) {
				if let Some(object) = row.as_object_mut() {
					for (k, v) in patch {
						object.insert(k.clone(), v.clone());
					}
				}
				updated.push(row.clone());
			}
		}
		Ok(updated)
	}

	async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
		let mut state = lock(&self.state);
		self.check(&state, table)?;

		let mut removed = Vec::new();
		if let Some(rows) = state.tables.get_mut(table) {
			let (gone, kept): (Vec<Value>, Vec<Value>) = rows
				.drain(..)
				.partition(|r| filters.iter().all(|f| matches(r, f)));
			*rows = kept;
			removed = gone;
		}
		Ok(removed)
	}

	async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
		let mut state = lock(&self.state);
		state.rpcs.push((function.to_string(), args));
		self.check(&state, function)?;
		Ok(Value::Null)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn wildcard_matching() {
		assert!(ilike("impersonate_user", "*USER*"));
		assert!(ilike("impersonate_user", "imp%"));
		assert!(!ilike("create_user", "*setting*"));
		assert!(ilike("", "*"));
	}

	#[tokio::test]
	async fn select_filters_orders_and_embeds() {
		let store = MemoryStore::new();
		store.seed("roles", vec![json!({"id": 1, "name": "admin", "colour": "#FF0000"})]);
		store.seed(
			"profiles",
			vec![
				json!({"id": "b", "full_name": "Bea", "role_id": 1}),
				json!({"id": "a", "full_name": "Al", "role_id": null}),
			],
		);

		let page = store
			.select(
				&Query::table("profiles")
					.select("*, roles(name)")
					.order("full_name", true)
					.with_count(),
			)
			.await
			.unwrap();
		assert_eq!(page.total, Some(2));
		assert_eq!(page.rows[0]["full_name"], "Al");
		assert!(page.rows[0]["roles"].is_null());
		assert_eq!(page.rows[1]["roles"], json!({"name": "admin"}));

		let page = store
			.select(&Query::table("profiles").filter(Filter::eq("id", "b")))
			.await
			.unwrap();
		assert_eq!(page.rows.len(), 1);
	}

	#[tokio::test]
	async fn insert_update_delete() {
		let store = MemoryStore::new();
		let inserted = store.insert("settings", json!({"key": "k"})).await.unwrap();
		let id = inserted[0]["id"].clone();

		let updated = store
			.update("settings", &[Filter::eq("id", &id)], json!({"key": "k2"}))
			.await
			.unwrap();
		assert_eq!(updated[0]["key"], "k2");

		let removed = store
			.delete("settings", &[Filter::eq("id", &id)])
			.await
			.unwrap();
		assert_eq!(removed.len(), 1);
		assert!(store.rows("settings").is_empty());
	}

	#[tokio::test]
	async fn failing_table_errors() {
		let store = MemoryStore::new();
		store.fail("logs");
		assert!(store.insert("logs", json!({"action": "x"})).await.is_err());
		store.fail("restore_last_sign_in");
		assert!(store.rpc("restore_last_sign_in", json!({})).await.is_err());
		assert_eq!(store.rpc_calls().len(), 1);
	}
}
