use super::{segment, texts};
use crate::{Incomplete, SourceKind};

#[test]
fn test_function_body_stays_together() {
    let code = r#"def factorial(n):
    if n <= 1:
        return 1
    return n * factorial(n - 1)

result = factorial(5)
print(f"Factorial of 5 is {result}")"#;
    let units = texts(SourceKind::Python, code);
    assert_eq!(units.len(), 3);
    assert!(units[0].starts_with("def factorial(n):"));
    assert!(units[0].ends_with("return n * factorial(n - 1)"));
    assert_eq!(units[1], "result = factorial(5)");
}

#[test]
fn test_two_statements() {
    let code = "import time\nsc.range(1, 10).foreach(lambda a: time.sleep(10))";
    assert_eq!(
        texts(SourceKind::Python, code),
        vec![
            "import time",
            "sc.range(1, 10).foreach(lambda a: time.sleep(10))"
        ]
    );
}

#[test]
fn test_if_else_is_one_statement() {
    let code = "if flag:\n    a = 1\nelse:\n    a = 2\nprint(a)";
    assert_eq!(
        texts(SourceKind::Python, code),
        vec!["if flag:\n    a = 1\nelse:\n    a = 2", "print(a)"]
    );
}

#[test]
fn test_try_except_finally() {
    let code = "try:\n    x()\nexcept ValueError:\n    pass\nfinally:\n    done()";
    assert_eq!(texts(SourceKind::Python, code).len(), 1);
}

#[test]
fn test_decorator_joins_definition() {
    let code = "@udf\ndef shout(s):\n    return s.upper()\nshout('a')";
    assert_eq!(
        texts(SourceKind::Python, code),
        vec!["@udf\ndef shout(s):\n    return s.upper()", "shout('a')"]
    );
}

#[test]
fn test_column_zero_comment_inside_body() {
    let code = "def f():\n    x = 1\n# note\n    return x\nf()";
    assert_eq!(
        texts(SourceKind::Python, code),
        vec!["def f():\n    x = 1\n# note\n    return x", "f()"]
    );
}

#[test]
fn test_docstring_with_hash_and_newlines() {
    let code = "doc = '''first # not a comment\nsecond'''\nprint(doc)";
    assert_eq!(
        texts(SourceKind::Python, code),
        vec!["doc = '''first # not a comment\nsecond'''", "print(doc)"]
    );
}

#[test]
fn test_backslash_continuation() {
    let code = "total = 1 + \\\n    2\nprint(total)";
    assert_eq!(texts(SourceKind::Python, code).len(), 2);
}

#[test]
fn test_list_literal_across_lines() {
    let code = "t = [{\"name\":\"userA\", \"role\":\"roleA\"},\n{\"name\":\"userB\", \"role\":\"roleB\"}]\n%table t";
    assert_eq!(
        texts(SourceKind::Python, code),
        vec![
            "t = [{\"name\":\"userA\", \"role\":\"roleA\"},\n{\"name\":\"userB\", \"role\":\"roleB\"}]",
            "%table t"
        ]
    );
}

#[test]
fn test_utf8_text_is_preserved() {
    let code = "print(\"你你你你你你好\")\nprint(\"açñiñíûÑoç\")";
    let segmentation = segment(SourceKind::Python, code);
    assert_eq!(segmentation.len(), 2);
    assert_eq!(segmentation.units[1].text, "print(\"açñiñíûÑoç\")");
    assert_eq!(segmentation.reconstruct(), code);
}

#[test]
fn test_unterminated_string() {
    let segmentation = segment(SourceKind::Python, "x = 1\ny = 'abc\nz = 2");
    assert_eq!(segmentation.len(), 2);
    assert_eq!(
        segmentation.units[1].incomplete,
        Some(Incomplete::UnterminatedString)
    );
}

#[test]
fn test_matplot_paragraph() {
    let code = "import matplotlib.pyplot as plt\nplt.switch_backend('agg')\ndata=[1,2,3,4]\nplt.figure()\nplt.plot(data)\n%matplot plt";
    let units = texts(SourceKind::Python, code);
    assert_eq!(units.len(), 6);
    assert_eq!(units[5], "%matplot plt");
}

#[test]
fn test_leading_comment_joins_first_statement() {
    assert_eq!(
        texts(SourceKind::Python, "# setup\nimport os\nprint(os.sep)"),
        vec!["# setup\nimport os", "print(os.sep)"]
    );
}
