//! Text sink rendering against a live console.

use debugcon_sinks::TextSink;
use debugcon_testing::ConsoleWorld;
use debugcon_types::{Value, ValueMap};

fn render_plain(world: &ConsoleWorld) -> String {
    let mut buffer = Vec::new();
    let mut sink = TextSink::new(&mut buffer, false);
    world.render_into(&mut sink).unwrap();
    drop(sink);
    String::from_utf8(buffer).unwrap()
}

#[test]
fn group_nesting_indents_four_spaces() {
    let world = ConsoleWorld::new()
        .logged("general", "main: log")
        .grouped("general", "g", |ctx| {
            ctx.root().log(vec![Value::Str("inner".into())]);
        });

    let output = render_plain(&world);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["main: log", "▸ g", "    inner"]);
}

#[test]
fn substitution_applies_and_appends_leftovers() {
    let world = ConsoleWorld::new();
    world.ctx().root().log(vec![
        Value::Str("user %s has %d items".into()),
        Value::Str("alice".into()),
        Value::Int(3),
        Value::Str("extra".into()),
    ]);

    let output = render_plain(&world);
    assert_eq!(output, "user alice has 3 items, extra\n");
}

#[test]
fn alert_renders_with_level_banner() {
    let world = ConsoleWorld::new()
        .alerted("disk full", "warn")
        .logged("general", "continuing");

    let output = render_plain(&world);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "[Alert warn] disk full");
    assert_eq!(lines[1], "continuing");
}

#[test]
fn table_renders_fixed_width_grid() {
    let rows = Value::array(vec![
        {
            let mut m = ValueMap::new();
            m.insert("name", "ada");
            m.insert("age", 36i64);
            Value::map(m)
        },
        {
            let mut m = ValueMap::new();
            m.insert("name", "grace");
            Value::map(m)
        },
    ]);
    let world = ConsoleWorld::new();
    world.ctx().root().table(Some("people"), rows);

    let output = render_plain(&world);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "people");
    assert!(lines[1].contains("name"));
    assert!(lines[1].contains("age"));
    assert!(lines[2].chars().all(|c| c == '-'));
    assert!(lines[3].contains("ada"));
    assert!(lines[3].contains("36"));
    // Missing cell renders as undefined, not as an omission
    assert!(lines[4].contains("grace"));
    assert!(lines[4].contains("undefined"));
}

#[test]
fn single_composite_argument_expands_multiline() {
    let world = ConsoleWorld::new();
    world
        .ctx()
        .root()
        .log(vec![Value::array(vec![Value::Int(1), Value::Int(2)])]);

    let output = render_plain(&world);
    assert!(output.starts_with("array("));
    assert!(output.contains("\n  1\n"));
    assert!(output.contains("\n  2\n"));
}

#[test]
fn file_target_swap_flushes_previous_stream() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.log");
    let second = dir.path().join("second.log");
    let world = ConsoleWorld::new().logged("general", "line");

    let mut sink = TextSink::new(std::fs::File::create(&first).unwrap(), false);
    world.render_into(&mut sink).unwrap();
    sink.set_target(std::fs::File::create(&second).unwrap())
        .unwrap();
    world.render_into(&mut sink).unwrap();
    drop(sink);

    assert_eq!(std::fs::read_to_string(&first).unwrap(), "line\n");
    assert_eq!(std::fs::read_to_string(&second).unwrap(), "line\n");
}

#[test]
fn unbalanced_group_end_does_not_underflow_indent() {
    let world = ConsoleWorld::new();
    let ch = world.ctx().root();
    ch.group_end();
    ch.group_end();
    ch.log(vec![Value::Str("still flush left".into())]);

    let output = render_plain(&world);
    assert_eq!(output, "still flush left\n");
}
