use buildlens::plugins::env::{build_child_env, is_secret_env_name};
use buildlens::plugins::ShellPathCache;
use std::path::Path;

#[test]
fn secret_variables_never_reach_the_child_environment() {
    std::env::set_var("BUILDLENS_TEST_API_TOKEN", "hunter2");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "hunter2");
    std::env::set_var("DATABASE_URL", "postgres://user:pw@host/db");
    std::env::set_var("BUILDLENS_TEST_PLAIN", "visible");

    let cache = ShellPathCache::new();
    let child_env = build_child_env(Path::new("/work/app"), &cache);

    assert!(!child_env.contains_key("BUILDLENS_TEST_API_TOKEN"));
    assert!(!child_env.contains_key("AWS_SECRET_ACCESS_KEY"));
    assert!(!child_env.contains_key("DATABASE_URL"));
    assert_eq!(
        child_env.get("BUILDLENS_TEST_PLAIN").map(String::as_str),
        Some("visible")
    );

    std::env::remove_var("BUILDLENS_TEST_API_TOKEN");
    std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("BUILDLENS_TEST_PLAIN");
}

#[test]
fn path_is_rebuilt_with_the_project_local_bin_first() {
    let cache = ShellPathCache::new();
    let child_env = build_child_env(Path::new("/work/app"), &cache);
    let path = child_env.get("PATH").expect("PATH always present");

    let first = path.split(':').next().expect("nonempty PATH");
    assert_eq!(first, "/work/app/node_modules/.bin");
}

#[test]
fn shell_path_discovery_is_memoized_until_reset() {
    let cache = ShellPathCache::new();
    let first = cache.user_shell_path();
    // memoized value is stable
    assert_eq!(cache.user_shell_path(), first);
    cache.reset();
    // re-discovery against the same environment lands on the same answer
    assert_eq!(cache.user_shell_path(), first);
}

#[test]
fn cloud_and_connection_string_names_are_classified_as_secrets() {
    assert!(is_secret_env_name("GITHUB_TOKEN"));
    assert!(is_secret_env_name("AZURE_CLIENT"));
    assert!(is_secret_env_name("MYSQL_CONNECTION_STRING"));
    assert!(is_secret_env_name("SENTRY_DSN"));
    assert!(!is_secret_env_name("EDITOR"));
    assert!(!is_secret_env_name("TERM"));
}
