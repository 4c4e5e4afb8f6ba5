use std::io::Write;

use indexmap::IndexMap;
use oleander::{
    value::{Value, ValueKind},
    ConsoleBridge, EditorSurface, ModuleRegistry, PushOutcome, Session, StaticRegistry, Trigger,
    HOST_BINDING, SCRIPT_PATH_BINDING,
};
use tempfile::NamedTempFile;

fn host_api(tag: &str) -> Value {
    let mut exports = IndexMap::new();
    exports.insert("tag".into(), Value::string(tag));
    Value::module("host", exports)
}

fn module_with_tag(name: &str, tag: i64) -> Value {
    let mut exports = IndexMap::new();
    exports.insert("tag".into(), Value::int(tag));
    Value::module(name, exports)
}

fn module_tag(value: &Value) -> i64 {
    match value.kind() {
        ValueKind::Module(module) => module.exports["tag"]
            .as_int()
            .expect("tag export should be an Int"),
        _ => panic!("expected Module, found {}", value.type_name()),
    }
}

fn expect_int(value: &Value) -> i64 {
    value
        .as_int()
        .unwrap_or_else(|| panic!("expected Int, found {}", value.type_name()))
}

fn startup_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write script");
    file.flush().expect("flush script");
    file
}

struct BrokenRegistry;

impl ModuleRegistry for BrokenRegistry {
    fn modules(&self) -> oleander::Result<Vec<(String, Value)>> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "registry offline").into())
    }
}

struct FakeSurface {
    document: String,
    selection: String,
}

impl EditorSurface for FakeSurface {
    fn document_text(&self) -> String {
        self.document.clone()
    }

    fn selection_text(&self) -> String {
        self.selection.clone()
    }
}

// ---- bootstrap ----

#[test]
fn auto_imports_populate_the_namespace() {
    let registry = StaticRegistry::new(vec![
        ("geo".into(), module_with_tag("geo", 1)),
        ("shade".into(), module_with_tag("shade", 2)),
    ]);
    let session = Session::bootstrap(host_api("app"), Some(&registry), None);
    assert_eq!(module_tag(&session.get("geo").expect("geo bound")), 1);
    assert_eq!(module_tag(&session.get("shade").expect("shade bound")), 2);
}

#[test]
fn duplicate_registry_alias_resolves_last_writer_wins() {
    let registry = StaticRegistry::new(vec![
        ("geo".into(), module_with_tag("geo_v1", 1)),
        ("geo".into(), module_with_tag("geo_v2", 2)),
    ]);
    let session = Session::bootstrap(host_api("app"), Some(&registry), None);
    assert_eq!(module_tag(&session.get("geo").expect("geo bound")), 2);
}

#[test]
fn host_binding_overrides_colliding_auto_import() {
    let registry = StaticRegistry::new(vec![(
        HOST_BINDING.to_string(),
        module_with_tag("imposter", 99),
    )]);
    let session = Session::bootstrap(host_api("the-real-one"), Some(&registry), None);
    let host = session.get(HOST_BINDING).expect("host bound");
    match host.kind() {
        ValueKind::Module(module) => {
            assert_eq!(module.exports["tag"].as_str(), Some("the-real-one"));
        }
        _ => panic!("host binding should be the host API module"),
    }
}

#[test]
fn broken_registry_imports_nothing_but_session_still_works() {
    let mut session = Session::bootstrap(host_api("app"), Some(&BrokenRegistry), None);
    assert!(session.get(HOST_BINDING).is_some());
    let value = session.run_batch("1 + 1").expect("session usable");
    assert_eq!(expect_int(&value), 2);
}

#[test]
fn executed_code_can_reach_the_host_api() {
    let mut session = Session::bootstrap(host_api("usd-app"), None, None);
    let value = session.run_batch("host.tag").expect("host reachable");
    assert_eq!(value.as_str(), Some("usd-app"));
}

// ---- startup script ----

#[test]
fn startup_script_populates_namespace_without_leaving_marker() {
    let file = startup_file("z = 5\n");
    let session = Session::bootstrap(
        host_api("app"),
        None,
        Some(file.path().to_string_lossy().into_owned()),
    );
    assert_eq!(expect_int(&session.get("z").expect("z bound")), 5);
    assert!(session.get(SCRIPT_PATH_BINDING).is_none());
}

#[test]
fn startup_script_can_read_its_own_path() {
    let file = startup_file("seen = __script_path__\n");
    let session = Session::bootstrap(
        host_api("app"),
        None,
        Some(file.path().to_string_lossy().into_owned()),
    );
    let seen = session.get("seen").expect("seen bound");
    let path = seen.as_str().expect("path is a string");
    assert!(!path.is_empty());
    assert!(session.get(SCRIPT_PATH_BINDING).is_none());
}

#[test]
fn failing_startup_script_keeps_prior_bindings_and_drops_marker() {
    let file = startup_file("q = 1\nraise(\"startup exploded\")\nnever = 2\n");
    let session = Session::bootstrap(
        host_api("app"),
        None,
        Some(file.path().to_string_lossy().into_owned()),
    );
    assert_eq!(expect_int(&session.get("q").expect("q bound")), 1);
    assert!(session.get("never").is_none());
    assert!(session.get(SCRIPT_PATH_BINDING).is_none());
}

#[test]
fn startup_script_overrides_auto_imports() {
    let registry = StaticRegistry::new(vec![("geo".into(), module_with_tag("geo", 1))]);
    let file = startup_file("geo = 7\n");
    let session = Session::bootstrap(
        host_api("app"),
        Some(&registry),
        Some(file.path().to_string_lossy().into_owned()),
    );
    assert_eq!(expect_int(&session.get("geo").expect("geo bound")), 7);
}

#[test]
fn missing_startup_script_is_silently_skipped() {
    let mut session = Session::bootstrap(
        host_api("app"),
        None,
        Some("/definitely/not/a/real/startup.ol".into()),
    );
    let value = session.run_batch("2 + 2").expect("session usable");
    assert_eq!(expect_int(&value), 4);
}

// ---- incremental evaluation ----

#[test]
fn single_complete_line_executes_immediately() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let outcome = session.push("x = 41").expect("push succeeds");
    assert!(matches!(outcome, PushOutcome::Evaluated(_)));
    assert_eq!(expect_int(&session.get("x").expect("x bound")), 41);
}

#[test]
fn open_block_accumulates_until_closed() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    assert!(matches!(
        session.push("if true {").expect("pending"),
        PushOutcome::Pending
    ));
    assert!(session.has_pending());
    assert!(matches!(
        session.push("    x = 1").expect("pending"),
        PushOutcome::Pending
    ));
    assert!(matches!(
        session.push("}").expect("completes"),
        PushOutcome::Evaluated(_)
    ));
    assert!(!session.has_pending());
    assert_eq!(expect_int(&session.get("x").expect("x bound")), 1);
}

#[test]
fn blank_lines_keep_an_open_statement_pending() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    session.push("fn double(n) {").expect("pending");
    session.push("").expect("still pending");
    session.push("    n * 2").expect("pending");
    session.push("}").expect("completes");
    let value = session.run_batch("double(21)").expect("function defined");
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn malformed_push_reports_syntax_error_and_resets() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let err = session.push("fn f( {").expect_err("malformed");
    assert!(err.is_syntax());
    assert!(!session.has_pending());
    let outcome = session.push("y = 2").expect("fresh start");
    assert!(matches!(outcome, PushOutcome::Evaluated(_)));
    assert_eq!(expect_int(&session.get("y").expect("y bound")), 2);
}

#[test]
fn runtime_error_in_push_propagates_and_clears_buffer() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let err = session.push("raise(\"live fire\")").expect_err("raises");
    assert!(err.is_runtime());
    assert!(!session.has_pending());
    session.push("k = 7").expect("session still usable");
    assert_eq!(expect_int(&session.get("k").expect("k bound")), 7);
}

#[test]
fn empty_push_on_empty_buffer_is_a_noop() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let outcome = session.push("").expect("noop");
    match outcome {
        PushOutcome::Evaluated(value) => assert!(value.is_unit()),
        PushOutcome::Pending => panic!("empty line should not start accumulating"),
    }
}

#[test]
fn reset_pending_discards_half_entered_statement() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    session.push("while true {").expect("pending");
    assert!(session.has_pending());
    session.reset_pending();
    assert!(!session.has_pending());
    let outcome = session.push("ok = 1").expect("fresh statement");
    assert!(matches!(outcome, PushOutcome::Evaluated(_)));
}

#[test]
fn dangling_operator_waits_for_the_rest() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    assert!(matches!(
        session.push("1 +").expect("pending"),
        PushOutcome::Pending
    ));
    let outcome = session.push("2").expect("completes");
    match outcome {
        PushOutcome::Evaluated(value) => assert_eq!(expect_int(&value), 3),
        PushOutcome::Pending => panic!("expression should be complete"),
    }
}

// ---- batch evaluation ----

#[test]
fn batch_executes_statements_in_order() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let value = session
        .run_batch("x = 1\ny = 2\nx + y")
        .expect("batch succeeds");
    assert_eq!(expect_int(&value), 3);
    assert_eq!(expect_int(&session.get("x").expect("x bound")), 1);
    assert_eq!(expect_int(&session.get("y").expect("y bound")), 2);
}

#[test]
fn batch_with_syntax_error_runs_nothing() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let err = session
        .run_batch("good = 1\n)")
        .expect_err("syntax error");
    assert!(err.is_syntax());
    assert!(session.get("good").is_none());
}

#[test]
fn batch_truncated_source_is_an_error_not_pending() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let err = session.run_batch("if true {").expect_err("truncated");
    assert!(err.is_syntax());
}

#[test]
fn batch_keeps_side_effects_before_a_runtime_error() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    let err = session
        .run_batch("a = 1\nraise(\"mid-flight\")\nb = 2")
        .expect_err("runtime error");
    assert!(err.is_runtime());
    assert_eq!(expect_int(&session.get("a").expect("a bound")), 1);
    assert!(session.get("b").is_none());
}

// ---- editor bridge ----

#[test]
fn selection_takes_precedence_over_document() {
    let surface = FakeSurface {
        document: "from_document = 1".into(),
        selection: "from_selection = 2".into(),
    };
    for trigger in [Trigger::Statement, Trigger::Program] {
        let mut bridge = ConsoleBridge::new(Session::bootstrap(host_api("app"), None, None));
        bridge.handle(trigger, &surface).expect("handled");
        let session = bridge.session();
        assert!(session.get("from_document").is_none());
        assert_eq!(
            expect_int(&session.get("from_selection").expect("selection ran")),
            2
        );
    }
}

#[test]
fn empty_selection_falls_back_to_whole_document() {
    let surface = FakeSurface {
        document: "doc_ran = 1".into(),
        selection: String::new(),
    };
    let mut bridge = ConsoleBridge::new(Session::bootstrap(host_api("app"), None, None));
    bridge.handle(Trigger::Program, &surface).expect("handled");
    assert!(bridge.session().get("doc_ran").is_some());
}

#[test]
fn statement_trigger_replays_document_line_by_line() {
    let surface = FakeSurface {
        document: "counter = 0\nfn bump() {\n    counter = counter + 1\n}\nbump()\nbump()\ncounter"
            .into(),
        selection: String::new(),
    };
    let mut bridge = ConsoleBridge::new(Session::bootstrap(host_api("app"), None, None));
    let value = bridge
        .handle(Trigger::Statement, &surface)
        .expect("handled");
    assert_eq!(expect_int(&value), 2);
    assert!(!bridge.session().has_pending());
}

#[test]
fn statement_trigger_surfaces_first_error_and_keeps_prior_effects() {
    let surface = FakeSurface {
        document: "a = 1\nraise(\"boom\")\nb = 2".into(),
        selection: String::new(),
    };
    let mut bridge = ConsoleBridge::new(Session::bootstrap(host_api("app"), None, None));
    let err = bridge
        .handle(Trigger::Statement, &surface)
        .expect_err("error surfaces");
    assert!(err.is_runtime());
    assert_eq!(expect_int(&bridge.session().get("a").expect("a bound")), 1);
    assert!(bridge.session().get("b").is_none());
}

#[test]
fn program_trigger_is_atomic_over_the_selection() {
    let surface = FakeSurface {
        document: String::new(),
        selection: "ok = 1\n)".into(),
    };
    let mut bridge = ConsoleBridge::new(Session::bootstrap(host_api("app"), None, None));
    let err = bridge
        .handle(Trigger::Program, &surface)
        .expect_err("syntax error");
    assert!(err.is_syntax());
    assert!(bridge.session().get("ok").is_none());
}

// ---- namespace sharing ----

#[test]
fn pushes_and_batches_share_one_namespace() {
    let mut session = Session::bootstrap(host_api("app"), None, None);
    session.push("base = 10").expect("push");
    let value = session.run_batch("base + 5").expect("batch sees push");
    assert_eq!(expect_int(&value), 15);
    session.run_batch("base = base * 2").expect("batch writes");
    match session.push("base").expect("push sees batch") {
        PushOutcome::Evaluated(value) => assert_eq!(expect_int(&value), 20),
        PushOutcome::Pending => panic!("expression should be complete"),
    }
}
