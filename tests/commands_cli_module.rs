use buildlens::commands::run_cli;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// one test body: the verbs share $HOME/$XDG_DATA_HOME, which must stay stable
#[test]
fn cli_verbs_round_trip_against_a_temporary_home() {
    let home = tempfile::tempdir().expect("temp home");
    let data = tempfile::tempdir().expect("temp data root");
    std::env::set_var("HOME", home.path());
    std::env::set_var("XDG_DATA_HOME", data.path());

    let help = run_cli(Vec::new()).expect("bare invocation prints help");
    assert!(help.contains("Commands:"));
    assert_eq!(run_cli(args(&["--help"])).expect("help flag"), help);

    let listed = run_cli(args(&["list"])).expect("list tools");
    let listed: serde_json::Value = serde_json::from_str(&listed).expect("list is json");
    let tools = listed["tools"].as_array().expect("tools array");
    assert!(tools
        .iter()
        .any(|tool| tool["name"] == "dotnet.build" && tool["mutatesWorkspace"] == false));

    let runs = run_cli(args(&["runs"])).expect("list runs");
    let runs: serde_json::Value = serde_json::from_str(&runs).expect("runs is json");
    assert_eq!(runs["runs"].as_array().expect("runs array").len(), 0);

    let cleaned = run_cli(args(&["cleanup"])).expect("cleanup");
    let cleaned: serde_json::Value = serde_json::from_str(&cleaned).expect("cleanup is json");
    assert_eq!(cleaned["removed"], 0);

    let raw = run_cli(args(&["raw", "not-a-uuid"])).expect("raw with bad id");
    let raw: serde_json::Value = serde_json::from_str(&raw).expect("raw error is json");
    assert_eq!(raw["code"], "INVALID_RUN_ID");

    let exec = run_cli(args(&["exec", "no.such.tool"])).expect("exec unknown tool");
    let exec: serde_json::Value = serde_json::from_str(&exec).expect("exec error is json");
    assert_eq!(exec["success"], false);
    assert_eq!(exec["errors"][0]["code"], "UNKNOWN_TOOL");

    assert!(run_cli(args(&["definitely-not-a-verb"])).is_err());
    assert!(run_cli(args(&["log-range"])).is_err());
    assert!(run_cli(args(&["exec"])).is_err());
}
