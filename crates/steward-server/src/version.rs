// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

/// Version string printed by `steward-server version`.
pub fn format_version_info() -> String {
	format!(
		"{} {}\n{}",
		env!("CARGO_PKG_NAME"),
		env!("CARGO_PKG_VERSION"),
		env!("CARGO_PKG_DESCRIPTION")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn version_info_names_the_binary() {
		let info = format_version_info();
		assert!(info.starts_with("steward-server "));
		assert!(info.contains(env!("CARGO_PKG_VERSION")));
	}
}
