use proptest::prelude::*;
use scout_engine::config::Config;
use scout_engine::sandbox::SandboxRoot;
use tempfile::TempDir;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("..".to_string()),
        Just(".".to_string()),
        Just("sub".to_string()),
        Just("file.txt".to_string()),
        "[a-z]{1,8}",
    ]
}

fn relative_path() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(segment(), 1..8)).prop_map(|(absolute, parts)| {
        let joined = parts.join("/");
        if absolute {
            format!("/{}", joined)
        } else {
            joined
        }
    })
}

/// Number of `..` that would escape when applied lexically from the root
fn escapes_lexically(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let mut depth: i32 = 0;
    for part in path.split('/') {
        match part {
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            "." | "" => {}
            _ => depth += 1,
        }
    }
    false
}

proptest! {
    // Whatever the model asks for, a successful resolution stays under the root
    #[test]
    fn test_resolved_paths_stay_inside_root(path in relative_path()) {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        let root = SandboxRoot::new(temp.path()).unwrap();

        if let Ok(resolved) = root.resolve(&path) {
            prop_assert!(resolved.starts_with(root.path()));
            prop_assert!(resolved.is_absolute());
        }
    }

    // Without symlinks, containment is exactly the lexical rule
    #[test]
    fn test_containment_matches_lexical_rule(path in relative_path()) {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("workspace")).unwrap();
        let root = SandboxRoot::new(temp.path().join("workspace")).unwrap();

        let result = root.resolve(&path);
        if escapes_lexically(&path) {
            prop_assert!(result.is_err(), "{} should escape", path);
        } else {
            prop_assert!(result.is_ok(), "{} should stay inside", path);
        }
    }

    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        max_iterations in 1..=100usize,
        llm_timeout_secs in 1..=600u64,
        max_read_chars in 1..=100_000usize,
        model in "gemini-[a-z0-9.-]{1,12}",
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level.clone();
        config.agent.max_iterations = max_iterations;
        config.agent.llm_timeout_secs = llm_timeout_secs;
        config.tools.max_read_chars = max_read_chars;
        config.llm.gemini.model = model.clone();

        let serialized = toml::to_string(&config).unwrap();
        let parsed = Config::parse(&serialized).unwrap();

        prop_assert_eq!(parsed.core.log_level, log_level);
        prop_assert_eq!(parsed.agent.max_iterations, max_iterations);
        prop_assert_eq!(parsed.agent.llm_timeout_secs, llm_timeout_secs);
        prop_assert_eq!(parsed.tools.max_read_chars, max_read_chars);
        prop_assert_eq!(parsed.llm.gemini.model, model);
    }
}
