fn run(source: &str) -> (bool, String) {
    let mut input: &[u8] = b"";
    let mut output = Vec::new();
    let ok = itmoscript::interpret(source, &mut input, &mut output);
    (ok, String::from_utf8(output).unwrap())
}

fn output_of(source: &str) -> String {
    let (ok, output) = run(source);
    assert!(ok, "program failed with output {:?}", output);
    output
}

fn error_of(source: &str) -> String {
    let (ok, output) = run(source);
    assert!(!ok, "program unexpectedly succeeded with output {:?}", output);
    output
}

#[test]
fn arithmetic_and_variables() {
    assert_eq!(output_of("a=5 b=3 c=a+b print(c)"), "8");
    assert_eq!(output_of("x = 3.14 y = 2.5 print(x * y)"), "7.85");
    assert_eq!(output_of("print(2 + 3 * 4 - 10 / 5)"), "12");
    assert_eq!(output_of("print(2 ^ 3 ^ 2)"), "64");
    assert_eq!(output_of("print(7 % 3) print(-7 % 3)"), "1-1");
    assert_eq!(output_of("x = 1 x += 2 x *= 5 x -= 1 x /= 2 print(x)"), "7");
    assert_eq!(output_of("x = 10 x %= 4 x ^= 3 print(x)"), "8");
    assert_eq!(output_of("a = 5 print(a-1) print(-a) print(- -1)"), "4-51");
}

#[test]
fn numeric_literals() {
    assert_eq!(
        output_of("print(1e3) print(.5) print(-2.5e-1)"),
        "10000.5-0.25"
    );
    assert_eq!(output_of("print(1 / 3)"), "0.33");
    assert_eq!(output_of("print(-0.0)"), "0");
}

#[test]
fn strings() {
    assert_eq!(
        output_of(r#"s="hello" s2="world" print(s+" "+s2)"#),
        "hello world"
    );
    assert_eq!(output_of(r#"print("hello world" - "world")"#), "hello ");
    assert_eq!(output_of(r#"print("ab" * 3) print(2 * "-")"#), "ababab--");
    assert_eq!(output_of(r#"print("a\tb\n") print("q\"q")"#), "a\tb\nq\"q");
    assert_eq!(output_of(r#"print("apple" < "banana")"#), "true");
    assert_eq!(
        output_of(r#"s = "hello" print(s[0]) print(s[-1]) print(s[1:3])"#),
        "hoel"
    );
}

#[test]
fn lists_and_indexing() {
    assert_eq!(
        output_of("a=[10,20,30,40,50] print(a[0]) print(a[4]) print(a[-1])"),
        "105050"
    );
    assert_eq!(output_of("print([1, 2] + [3])"), "[1, 2, 3]");
    assert_eq!(output_of("print([0] * 3)"), "[0, 0, 0]");
    assert_eq!(
        output_of("print([1, \"a\", [nil, true]])"),
        "[1, \"a\", [nil, true]]"
    );
    assert_eq!(
        output_of("a = [1,2,3,4,5] print(a[1:3]) print(a[:2]) print(a[3:]) print(a[-2:])"),
        "[2, 3][1, 2][4, 5][4, 5]"
    );
    assert_eq!(
        output_of("a = [1,2,3] print(a[2:1]) print(a[-100:100])"),
        "[][1, 2, 3]"
    );
    assert_eq!(output_of("f=[1,2] b=f[:] push(f,3) print(len(b))"), "2");
    assert_eq!(output_of("print([1,2,3][1]) print(\"xyz\"[:1])"), "2x");
}

#[test]
fn index_errors() {
    assert_eq!(
        error_of("a = [1, 2] print(a[2])"),
        "Error: List index 2 out of range for length 2\n"
    );
    assert!(error_of("a = [1, 2] print(a[-3])").starts_with("Error: "));
    assert!(error_of("x = 5 print(x[0])")
        .starts_with("Error: Cannot index"));
    assert!(error_of("a = [1] print(a[\"0\"])")
        .starts_with("Error: Index must be a number"));
}

#[test]
fn nil_and_booleans() {
    assert_eq!(
        output_of("x = nil print(x == nil) print(x != 5)"),
        "truetrue"
    );
    assert_eq!(
        output_of("print(true and nil) print(nil or 1) print(not nil) print(not 0)"),
        "falsetruetruefalse"
    );
    assert_eq!(
        output_of("print(true && false) print(false || true)"),
        "falsetrue"
    );
    assert_eq!(
        output_of(
            "a = 5 b = 10 print(a == a) print(a == b) print(a != b) \
             print(a < b) print(a > b) print(a <= a) print(a >= b)"
        ),
        "truefalsetruetruefalsetruefalse"
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(
        output_of("print(false and undefined_name) print(true or undefined_name)"),
        "falsetrue"
    );
    assert!(error_of("print(true and undefined_name)")
        .contains("Undefined variable: undefined_name"));
}

#[test]
fn conditionals() {
    let source = r#"
        classify = function(n)
            if n < 0 then
                return "negative"
            else if n == 0 then
                return "zero"
            else if n < 10 then
                return "small"
            else
                return "large"
            end if
        end function
        print(classify(-1)) print(classify(0)) print(classify(5)) print(classify(50))
    "#;
    assert_eq!(output_of(source), "negativezerosmalllarge");
    assert_eq!(output_of("if 1 > 2 then print(1) end if print(2)"), "2");
    assert_eq!(
        error_of("if 1 then print(1) end if"),
        "Error: If condition must be a boolean, got number\n"
    );
}

#[test]
fn while_loops() {
    assert_eq!(
        output_of("i = 0 while i < 5 print(i) i = i + 1 end while"),
        "01234"
    );
    assert_eq!(
        output_of("i = 0 while i < 10 if i == 5 then break end if print(i) i += 1 end while"),
        "01234"
    );
    assert_eq!(
        output_of("i = 0 while i < 5 i += 1 if i == 3 then continue end if print(i) end while"),
        "1245"
    );
    assert!(error_of("while nil print(1) end while")
        .contains("While condition"));
}

#[test]
fn for_loops() {
    assert_eq!(
        output_of("for i in range(0, 5, 1) print(i) end for"),
        "01234"
    );
    assert_eq!(output_of("for i = 10, 0, -3 print(i) end for"), "10741");
    assert_eq!(
        output_of("for i in range(0, 10, 1) if i == 5 then break end if print(i) end for"),
        "01234"
    );
    assert_eq!(
        output_of("for i in range(1, 6, 1) if i == 3 then continue end if print(i) end for"),
        "1245"
    );
    assert_eq!(
        output_of("for i in range(0, 3, 1) for j in range(0, 2, 1) print(i * j) end for end for"),
        "000102"
    );
    assert_eq!(output_of("for x in [\"a\", 1] print(x) end for"), "a1");
    assert_eq!(output_of("for c in \"hey\" print(upper(c)) end for"), "HEY");
    assert_eq!(output_of("for i in range(0, 3) print(i) end for"), "012");
    assert!(error_of("for i in range(0, 5, 0) print(i) end for")
        .contains("step cannot be zero"));
    assert!(error_of("for i in 5 print(i) end for")
        .contains("Cannot iterate"));
    assert!(error_of("for i = 0, \"5\", 1 end for")
        .contains("must be numbers"));
}

#[test]
fn loop_variables_do_not_leak_out_of_for() {
    assert!(error_of("for i in range(0, 2, 1) end for print(i)")
        .contains("Undefined variable: i"));
    assert_eq!(
        output_of("total = 0 for i in range(0, 4, 1) total += i end for print(total)"),
        "0"
    );
    assert_eq!(
        output_of("total = 0 i = 0 while i < 4 total += i i += 1 end while print(total)"),
        "6"
    );
}

#[test]
fn comments() {
    let source = "
        // line comment
        x = 1 /* block
        comment */ print(x) // trailing
    ";
    assert_eq!(output_of(source), "1");
}

#[test]
fn type_mixing_fails() {
    let values = ["123", "\"string\"", "[1, 2, 3]", "function() end function", "nil"];
    for (i, a) in values.iter().enumerate() {
        for b in &values[i + 1..] {
            let source = format!("a = {}\nb = {}\nc = a + b\nprint(239) // unreachable\n", a, b);
            let output = error_of(&source);
            assert!(!output.contains("239"), "{} + {} printed {:?}", a, b, output);
            assert!(output.starts_with("Error: "));
        }
    }
}

#[test]
fn runtime_errors() {
    assert_eq!(error_of("print(1 / 0)"), "Error: Division by zero\n");
    assert_eq!(error_of("print(1 % 0)"), "Error: Modulo by zero\n");
    assert_eq!(error_of("break"), "Error: Break statement outside loop\n");
    assert_eq!(
        error_of("continue"),
        "Error: Continue statement outside loop\n"
    );
    assert_eq!(
        error_of("return 1"),
        "Error: Return statement outside function\n"
    );
    assert_eq!(error_of("print(y)"), "Error: Undefined variable: y\n");
    assert_eq!(
        error_of("x = 1 x()"),
        "Error: Cannot call a non-function value of type number\n"
    );
    assert_eq!(
        error_of("print(-\"a\")"),
        "Error: Unary - is not supported for type string\n"
    );
    assert_eq!(
        error_of("print(true == true)"),
        "Error: Unsupported operation for given types: bool == bool\n"
    );
}

#[test]
fn oversized_repetition_fails() {
    assert_eq!(
        error_of("print([1, 2] * 1e19)"),
        "Error: Repeat count too large\n"
    );
    assert_eq!(
        error_of("print(len(\"ab\" * 1e19))"),
        "Error: Repeat count too large\n"
    );
    assert_eq!(
        output_of("print(len([] * 1e19)) print(len(\"\" * 1e19))"),
        "00"
    );
}

#[test]
fn output_before_an_error_is_kept() {
    assert_eq!(
        error_of("print(1) print(2) print(1/0) print(3)"),
        "12Error: Division by zero\n"
    );
}

#[test]
fn lex_and_parse_errors() {
    assert_eq!(
        error_of("x = 1 # 2"),
        "Error: [line 1:7] Invalid character: '#'\n"
    );
    assert_eq!(
        error_of("s = \"open"),
        "Error: [line 1:5] Unterminated string literal\n"
    );
    assert!(error_of("x = 1.2.3")
        .starts_with("Error: [line 1:5] Invalid number format"));
    assert_eq!(
        error_of("if true then print(1)"),
        "Error: [line 1:22] Expected 'end', found end of input\n"
    );
    assert!(error_of("print(1) a[]")
        .contains("Expected index or slice"));
    // Nothing runs when parsing fails.
    assert_eq!(
        error_of("print(1) while"),
        "Error: [line 1:15] Expected expression, found end of input\n"
    );
}

#[test]
fn empty_program_succeeds() {
    assert_eq!(output_of(""), "");
    assert_eq!(output_of("  // nothing\n"), "");
}

#[test]
fn run_reports_typed_errors() {
    let mut input: &[u8] = b"";
    let mut output = Vec::new();
    match itmoscript::run("print(1/0)", &mut input, &mut output) {
        Err(itmoscript::Error::Runtime(e)) => assert_eq!(e.to_string(), "Division by zero"),
        other => panic!("unexpected result {:?}", other),
    }
    match itmoscript::run("(", &mut input, &mut output) {
        Err(itmoscript::Error::Parse(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
    match itmoscript::run("@", &mut input, &mut output) {
        Err(itmoscript::Error::Lex(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }
}
