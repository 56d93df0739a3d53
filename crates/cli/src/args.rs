//! Pre-parse normalization of legacy switch spellings.

/// Maps the legacy `/install`, `-install`, `/uninstall`, and `-uninstall`
/// switches onto the matching subcommands before clap sees the arguments.
pub fn normalize(argv: Vec<String>) -> Vec<String> {
	argv.into_iter()
		.map(|arg| match arg.as_str() {
			"/install" | "-install" => "install".to_string(),
			"/uninstall" | "-uninstall" => "uninstall".to_string(),
			_ => arg,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn argv(args: &[&str]) -> Vec<String> {
		args.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn legacy_install_switches_become_the_subcommand() {
		assert_eq!(normalize(argv(&["rdpmon", "/install"])), argv(&["rdpmon", "install"]));
		assert_eq!(normalize(argv(&["rdpmon", "-install"])), argv(&["rdpmon", "install"]));
		assert_eq!(
			normalize(argv(&["rdpmon", "/uninstall"])),
			argv(&["rdpmon", "uninstall"])
		);
		assert_eq!(
			normalize(argv(&["rdpmon", "-uninstall"])),
			argv(&["rdpmon", "uninstall"])
		);
	}

	#[test]
	fn modern_arguments_pass_through_unchanged() {
		let args = argv(&["rdpmon", "start", "--no-fallback", "-v"]);
		assert_eq!(normalize(args.clone()), args);
	}
}
