//! End-to-end scenarios: source text in, `print` output out.
use std::path::PathBuf;
use std::rc::Rc;

use scriptpp::{CollectStringPrint, Interpreter, NoopTracer, Program};

fn run(source: &str) -> String {
    let print = Rc::new(CollectStringPrint::new());
    let program = Program::with_print(PathBuf::from("."), print.clone());
    let mut interp = Interpreter::new(program.clone(), Rc::new(NoopTracer));
    program.run_source(&mut interp, source, "<test>").expect("script should run to completion");
    print.joined()
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("print(1 + 2 * 3);"), "7");
}

#[test]
fn list_sort_with_custom_comparator() {
    let src = r#"
        let xs = [3,1,2];
        xs.sort(fn(a,b) -> when { a < b -> -1; a > b -> 1; else -> 0 });
        print(xs.join(","));
    "#;
    assert_eq!(run(src), "1,2,3");
}

#[test]
fn closures_capture_enclosing_locals() {
    let src = r#"
        fn mk(n){ fn() -> n }
        let f = mk(42);
        print(f());
    "#;
    assert_eq!(run(src), "42");
}

#[test]
fn class_ctor_and_string_override() {
    let src = r#"
        class Point {
            fn __ctor__(x,y){ this.x = x; this.y = y }
            fn __string__() -> "(" + x + "," + y + ")"
        }
        print(Point(3,4));
    "#;
    assert_eq!(run(src), "(3,4)");
}

#[test]
fn throw_is_caught_with_exception_data_intact() {
    let src = r#"
        try { throw "boom"; } catch e { print(e.data); }
    "#;
    assert_eq!(run(src), "boom");
}

#[test]
fn dict_put_overwrites_existing_key() {
    let src = r#"
        let d = Dict();
        d.put("k", 1);
        d.put("k", 2);
        print(d.get("k"));
    "#;
    assert_eq!(run(src), "2");
}

#[test]
fn argument_binding_defaults_named_and_overflow() {
    let src = r#"
        fn f(a=1, b=2){ print(a); print(b); print(__args__.size()); }
        f();
        f(10);
        f(b:5);
    "#;
    assert_eq!(run(src), "1\n2\n0\n10\n2\n1\n1\n5\n0");
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let src = r#"
        let total = 0;
        for (let i = 0; i < 3; i += 1) {
            for (let j = 0; j < 3; j += 1) {
                when { j == 1 -> break; }
                total += 1;
            }
        }
        print(total);
    "#;
    assert_eq!(run(src), "3");
}

#[test]
fn continue_skips_to_the_update_clause() {
    let src = r#"
        let total = 0;
        for (let i = 0; i < 5; i += 1) {
            when { i == 2 -> continue; }
            total += i;
        }
        print(total);
    "#;
    assert_eq!(run(src), "8");
}

#[test]
fn uncaught_runtime_error_propagates_to_run_source() {
    let print = Rc::new(CollectStringPrint::new());
    let program = Program::with_print(PathBuf::from("."), print.clone());
    let mut interp = Interpreter::new(program.clone(), Rc::new(NoopTracer));
    let err = program.run_source(&mut interp, "print(1 / 0);", "<test>").unwrap_err();
    assert_eq!(err.exc_type.to_string(), "RuntimeError");
}

#[test]
fn string_indexing_yields_a_writable_reference() {
    let src = r#"
        let s = "cat";
        s[0] = "b";
        print(s);
    "#;
    assert_eq!(run(src), "bat");
}

#[test]
fn number_widens_on_mixed_arithmetic() {
    assert_eq!(run("print(1 + 2.5);"), "3.5");
}

#[test]
fn logical_not_treats_falsy_non_booleans_as_false() {
    let src = r#"
        print(!0);
        print(!null);
        print(!1);
        print(!"");
        print(!"x");
    "#;
    assert_eq!(run(src), "true\ntrue\nfalse\ntrue\nfalse");
}

#[test]
fn uncaught_error_stack_has_one_entry_per_activation() {
    let print = Rc::new(CollectStringPrint::new());
    let program = Program::with_print(PathBuf::from("."), print.clone());
    let mut interp = Interpreter::new(program.clone(), Rc::new(NoopTracer));
    let src = r#"
        fn outer(){
            fn inner(){ throw "boom"; }
            inner();
        }
        outer();
    "#;
    let err = program.run_source(&mut interp, src, "<test>").unwrap_err();
    assert_eq!(err.stack.len(), 2);
}

#[test]
fn uncaught_error_stack_has_single_entry_for_a_single_call() {
    let print = Rc::new(CollectStringPrint::new());
    let program = Program::with_print(PathBuf::from("."), print.clone());
    let mut interp = Interpreter::new(program.clone(), Rc::new(NoopTracer));
    let src = r#"
        fn f(){ throw "boom"; }
        f();
    "#;
    let err = program.run_source(&mut interp, src, "<test>").unwrap_err();
    assert_eq!(err.stack.len(), 1);
}
