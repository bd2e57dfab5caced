mod common;

#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use std::thread;

    use rox::error::LoxError;
    use rox::interpreter::MAX_CALL_DEPTH;
    use rox::value::Value;

    use crate::common::{interpreter, parse_ok, run, run_ok};

    /// Run a program that must fail at run time; returns output so far and
    /// the single error.
    fn run_err(source: &str) -> (String, LoxError) {
        let (out, mut errors) = run(source);

        assert_eq!(errors.len(), 1, "expected exactly one error: {:?}", errors);
        let err = errors.remove(0);
        assert!(err.is_runtime(), "expected a runtime error, got {:?}", err);

        (out, err)
    }

    // ── arithmetic & formatting ────────────────────────────────────────────

    #[test]
    fn numbers_print_with_two_decimals() {
        assert_eq!(run_ok("print 1 + 2;"), "3.00\n");
        assert_eq!(run_ok("print 10 - 4 * 2;"), "2.00\n");
        assert_eq!(run_ok("print 7 / 2;"), "3.50\n");
        assert_eq!(run_ok("print -(3);"), "-3.00\n");
    }

    #[test]
    fn integer_sums() {
        for (a, b) in [(0, 0), (1, 2), (40, 2), (123, 877), (99999, 1)] {
            let out = run_ok(&format!("print {} + {};", a, b));
            assert_eq!(out, format!("{:.2}\n", (a + b) as f64));
        }
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
    }

    #[test]
    fn mixed_plus_is_a_type_error() {
        let (out, err) = run_err("print \"a\" + 1;");

        assert_eq!(out, "");
        assert_eq!(err.to_string(), "1: Operands must be two numbers or two strings.");
    }

    #[test]
    fn arithmetic_and_comparison_require_numbers() {
        let (_, err) = run_err("print 1 < \"2\";");
        assert_eq!(err.message(), "Operands must be numbers.");

        let (_, err) = run_err("print nil * 2;");
        assert_eq!(err.message(), "Operands must be numbers.");

        let (_, err) = run_err("print -\"x\";");
        assert_eq!(err.message(), "Operand must be a number.");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (_, err) = run_err("print 1 / 0;");
        assert_eq!(err.message(), "Division by zero.");
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            run_ok("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 5;"),
            "true\ntrue\nfalse\nfalse\n"
        );
    }

    // ── truthiness, equality, logic ────────────────────────────────────────

    #[test]
    fn zero_and_empty_string_are_truthy() {
        assert_eq!(run_ok("if (0) print \"t\"; else print \"f\";"), "t\n");
        assert_eq!(run_ok("if (\"\") print \"t\"; else print \"f\";"), "t\n");
    }

    #[test]
    fn nil_and_false_are_falsey() {
        assert_eq!(run_ok("if (nil) print \"t\"; else print \"f\";"), "f\n");
        assert_eq!(run_ok("if (false) print \"t\"; else print \"f\";"), "f\n");
        assert_eq!(run_ok("print !nil; print !0;"), "true\nfalse\n");
    }

    #[test]
    fn equality_rules() {
        assert_eq!(
            run_ok(
                "print nil == nil; print nil == false; print 1 == 1; \
                 print \"a\" == \"a\"; print 1 == \"1\"; print true != false;"
            ),
            "true\nfalse\ntrue\ntrue\nfalse\ntrue\n"
        );
    }

    #[test]
    fn callables_compare_by_identity() {
        assert_eq!(
            run_ok("fun f() {} fun g() {} var h = f; print f == h; print f == g;"),
            "true\nfalse\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit_and_return_operands() {
        assert_eq!(
            run_ok("print nil or \"x\"; print false and undefined; print 1 and 2; print 1 or undefined;"),
            "x\nfalse\n2.00\n1.00\n"
        );
    }

    // ── variables & scope ──────────────────────────────────────────────────

    #[test]
    fn block_shadowing() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            "2.00\n1.00\n"
        );
    }

    #[test]
    fn uninitialised_var_is_nil_and_globals_may_be_redefined() {
        assert_eq!(run_ok("var a; print a; var a = 3; print a;"), "nil\n3.00\n");
    }

    #[test]
    fn assignment_reaches_enclosing_scope() {
        assert_eq!(
            run_ok("var a = 1; { a = a + 1; { a = a * 10; } } print a;"),
            "20.00\n"
        );
        assert_eq!(run_ok("var a; var b; a = b = 5; print a; print b;"), "5.00\n5.00\n");
    }

    #[test]
    fn undefined_variables() {
        let (_, err) = run_err("print x;");
        assert_eq!(err.to_string(), "1: Undefined variable 'x'.");

        let (_, err) = run_err("\n\ny = 1;");
        assert_eq!(err.to_string(), "3: Undefined variable 'y'.");
    }

    #[test]
    fn loops() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0.00\n1.00\n2.00\n"
        );
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0.00\n1.00\n2.00\n"
        );
        assert_eq!(
            run_ok("var s = 0; for (var i = 1; i <= 4; i = i + 1) { var sq = i * i; s = s + sq; } print s;"),
            "30.00\n"
        );
    }

    #[test]
    fn for_loop_variable_is_scoped_to_the_loop() {
        let (out, err) = run_err("for (var i = 0; i < 1; i = i + 1) {} print i;");

        assert_eq!(out, "");
        assert_eq!(err.message(), "Undefined variable 'i'.");
    }

    // ── functions & closures ───────────────────────────────────────────────

    #[test]
    fn functions_return_values() {
        assert_eq!(
            run_ok("fun add(a, b) { return a + b; } print add(2, 3);"),
            "5.00\n"
        );
        assert_eq!(run_ok("fun f() { return; } print f();"), "nil\n");
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn recursion() {
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55.00\n"
        );
    }

    #[test]
    fn return_unwinds_through_loops_and_blocks() {
        assert_eq!(
            run_ok(
                "fun first(limit) {\n\
                   for (var i = 0; i < limit; i = i + 1) {\n\
                     { if (i == 2) return i; }\n\
                   }\n\
                   return -1;\n\
                 }\n\
                 print first(10);\n\
                 print first(1);"
            ),
            "2.00\n-1.00\n"
        );
    }

    #[test]
    fn closures_share_captured_state_across_calls() {
        assert_eq!(
            run_ok(
                "fun makeCounter() {\n\
                   var count = 0;\n\
                   fun increment() { count = count + 1; return count; }\n\
                   return increment;\n\
                 }\n\
                 var counter = makeCounter();\n\
                 print counter();\n\
                 print counter();\n\
                 var other = makeCounter();\n\
                 print other();"
            ),
            "1.00\n2.00\n1.00\n"
        );
    }

    #[test]
    fn closures_capture_the_declaring_environment() {
        assert_eq!(
            run_ok(
                "fun outer() {\n\
                   var x = \"outer\";\n\
                   fun inner() { print x; }\n\
                   x = \"changed\";\n\
                   return inner;\n\
                 }\n\
                 var x = \"global\";\n\
                 outer()();"
            ),
            "changed\n"
        );
    }

    #[test]
    fn two_closures_share_one_environment() {
        assert_eq!(
            run_ok(
                "var get; var set;\n\
                 fun make() {\n\
                   var v = 1;\n\
                   fun g() { return v; }\n\
                   fun s(n) { v = n; }\n\
                   get = g; set = s;\n\
                 }\n\
                 make();\n\
                 set(42);\n\
                 print get();"
            ),
            "42.00\n"
        );
    }

    #[test]
    fn arity_is_checked() {
        let (_, err) = run_err("fun f(a, b) {}\nf(1);");
        assert_eq!(err.to_string(), "2: Expected 2 arguments but got 1.");
    }

    #[test]
    fn only_callables_can_be_called() {
        let (_, err) = run_err("\"not a function\"();");
        assert_eq!(err.message(), "Can only call functions and classes.");

        let (_, err) = run_err("var n = 1; n(2);");
        assert_eq!(err.message(), "Can only call functions and classes.");
    }

    #[test]
    fn callables_display() {
        assert_eq!(
            run_ok("fun f() {} class C {} print f; print clock; print C;"),
            "<fn f>\n<native fn>\nC\n"
        );
    }

    #[test]
    fn clock_is_predefined() {
        assert_eq!(run_ok("print clock() >= 0;"), "true\n");

        let (_, err) = run_err("clock(1);");
        assert_eq!(err.message(), "Expected 0 arguments but got 1.");
    }

    // ── classes ────────────────────────────────────────────────────────────

    #[test]
    fn instances_hold_freeform_fields() {
        assert_eq!(
            run_ok(
                "class Point {}\n\
                 var p = Point();\n\
                 p.x = 3;\n\
                 p.y = p.x + 1;\n\
                 print p.x; print p.y; print p;"
            ),
            "3.00\n4.00\nPoint instance\n"
        );
    }

    #[test]
    fn instances_are_shared_by_reference() {
        assert_eq!(
            run_ok("class A {} var a = A(); var b = a; b.v = \"seen\"; print a.v; print a == b; print a == A();"),
            "seen\ntrue\nfalse\n"
        );
    }

    #[test]
    fn unset_field_is_a_runtime_error() {
        let (_, err) = run_err("class A {}\nprint A().missing;");
        assert_eq!(err.to_string(), "2: Undefined property 'missing'.");
    }

    #[test]
    fn fields_only_exist_on_instances() {
        let (_, err) = run_err("var a = 1; a.x = 2;");
        assert_eq!(err.message(), "Only instances have fields.");

        let (_, err) = run_err("print \"s\".len;");
        assert_eq!(err.message(), "Only instances have properties.");
    }

    #[test]
    fn classes_take_no_arguments() {
        let (_, err) = run_err("class A {} A(1);");
        assert_eq!(err.message(), "Expected 0 arguments but got 1.");
    }

    // ── error policy ───────────────────────────────────────────────────────

    #[test]
    fn runtime_error_keeps_earlier_output_and_stops() {
        let (out, err) = run_err("print 1;\nprint -\"x\";\nprint 2;");

        assert_eq!(out, "1.00\n");
        assert_eq!(err.to_string(), "2: Operand must be a number.");
    }

    #[test]
    fn scope_is_restored_after_an_error_inside_a_block() {
        let (mut interpreter, buf) = interpreter();

        assert!(rox::run(&mut interpreter, "var a = \"outer\";").is_empty());

        let errors = rox::run(&mut interpreter, "{ var a = \"inner\"; print nope; }");
        assert_eq!(errors.len(), 1);

        assert!(rox::run(&mut interpreter, "print a;").is_empty());
        assert_eq!(buf.contents(), "outer\n");
    }

    #[test]
    fn state_persists_across_runs_in_one_interpreter() {
        let (mut interpreter, buf) = interpreter();

        assert!(rox::run(&mut interpreter, "fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }").is_empty());
        assert!(rox::run(&mut interpreter, "var c = make();").is_empty());
        assert!(rox::run(&mut interpreter, "print c(); print c();").is_empty());

        assert_eq!(buf.contents(), "1.00\n2.00\n");
        assert!(matches!(
            interpreter.globals().borrow().get("c", 0),
            Ok(Value::Callable(_))
        ));
    }

    #[test]
    fn earlier_stage_errors_prevent_execution() {
        let (out, errors) = run("print 1;\nprint @;");
        assert_eq!(out, "");
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_runtime());

        let (out, errors) = run("print 1;\nprint ;");
        assert_eq!(out, "");
        assert_eq!(errors[0].to_string(), "2: Expected expression");
    }

    // ── call depth ─────────────────────────────────────────────────────────

    /// Runs `f` on a thread with the stack size of a main thread, the
    /// environment the binary runs programs in.
    fn on_main_sized_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        thread::Builder::new()
            .stack_size(8 << 20)
            .spawn(f)
            .expect("spawn interpreter thread")
            .join()
            .expect("interpreter thread panicked")
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let (out, errors) = on_main_sized_stack(|| run("fun f(n) { return f(n + 1); }\nf(0);"));

        assert_eq!(out, "");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_runtime());
        assert_eq!(errors[0].to_string(), "1: Stack overflow.");
    }

    #[test]
    fn recursion_within_the_limit_succeeds() {
        let source = format!(
            "fun down(n) {{ if (n == 0) return 0; return down(n - 1); }} print down({});",
            MAX_CALL_DEPTH - 1
        );

        let out = on_main_sized_stack(move || run_ok(&source));

        assert_eq!(out, "0.00\n");
    }

    #[test]
    fn call_depth_recovers_after_overflow() {
        let out = on_main_sized_stack(|| {
            let (mut interpreter, buf) = interpreter();

            let errors = rox::run(&mut interpreter, "fun f() { f(); } f();");
            assert_eq!(errors.len(), 1);

            // A fresh chain of calls gets the full budget again.
            let source = format!(
                "fun down(n) {{ if (n > 0) down(n - 1); }} down({}); print \"ok\";",
                MAX_CALL_DEPTH - 1
            );
            assert!(rox::run(&mut interpreter, &source).is_empty());

            buf.contents()
        });

        assert_eq!(out, "ok\n");
    }

    #[test]
    fn unresolved_top_level_return_reports_its_line() {
        let (mut interpreter, _buf) = interpreter();

        // Skips the resolver, which would reject this statically.
        let err = interpreter
            .interpret(&parse_ok("print 1;\nif (true) return;"))
            .expect_err("top-level return");

        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "2: Cannot return from top-level code.");
    }
}
