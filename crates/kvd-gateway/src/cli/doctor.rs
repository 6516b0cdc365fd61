use kvd_domain::config::{Config, ConfigSeverity};

/// Run diagnostic checks and print a summary. Returns `true` when every
/// check passes.
pub fn run(config: &Config, config_path: &str) -> bool {
    println!("kvdrived doctor");
    println!("===============\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_paths_writable(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }
    all_passed
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    // A missing config file is not fatal — defaults are valid — so this
    // check does not flip all_passed.
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let passed = error_count == 0;
    print_check(
        "Config validates",
        passed,
        format!("{} issue(s)", issues.len()),
    );
    if !passed {
        *all_passed = false;
    }
}

fn check_paths_writable(config: &Config, all_passed: &mut bool) {
    for (label, path) in [
        ("Snapshot path's directory", &config.paths.default_snapshot),
        ("Profile path's directory", &config.paths.default_profile),
    ] {
        let dir = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let writable = dir.metadata().map(|m| !m.permissions().readonly()).unwrap_or(false);
        print_check(label, writable, dir.display().to_string());
        if !writable {
            *all_passed = false;
        }
    }
}

fn print_check(label: &str, passed: bool, detail: String) {
    let mark = if passed { "OK" } else { "FAIL" };
    println!("[{mark}] {label}: {detail}");
}
