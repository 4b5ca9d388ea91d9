use lispy::environment::{load_file, Prelude};
use lispy::interpreter::{rep, Error};
use lispy::{Environment, Symbol, Value};
use std::io::Write;

#[test]
fn a_small_program() {
    let env = Prelude::new().as_env();
    let program = r#"
        ; squares, backwards
        (define 'reverse
          (lambda (xs)
            (cond ((null? xs) '())
                  (else (append (reverse (cdr xs)) (list (car xs)))))))
        (reverse (map (lambda (x) (* x x)) '(1 2 3 4)))
    "#;
    assert_eq!(rep(program, &env).unwrap(), "(16 9 4 1)");
    assert_eq!(rep("(str \"a\" 1 #t)", &env).unwrap(), "\"a1#t\"");
    assert_eq!(rep("(read \"(1 . 2)\")", &env).unwrap(), "(1 . 2)");
}

#[test]
fn errors_leave_earlier_definitions_in_place() {
    let env = Prelude::new().as_env();
    let err = rep("(define 'a 1) (car '()) (define 'b 2)", &env).unwrap_err();
    assert!(matches!(err, Error::Eval(_)));
    assert_eq!(env.lookup(&Symbol::new("a")).unwrap(), Value::Number(1.0));
    assert!(env.lookup(&Symbol::new("b")).is_err());
}

#[test]
fn load_evaluates_a_file_into_the_prelude() {
    let mut path = std::env::temp_dir();
    path.push(format!("lispy-load-{}.lisp", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"(define 'double (lambda (x) (* 2 x)))\n(double 4)\n")
        .unwrap();

    let prelude = Prelude::new();
    assert_eq!(
        load_file(path.to_str().unwrap(), &prelude).unwrap(),
        Value::Number(8.0)
    );
    let env = prelude.as_env();
    let source = format!("(load {:?}) (double 21)", path.to_str().unwrap());
    assert_eq!(rep(&source, &env).unwrap(), "42");
    std::fs::remove_file(path).ok();
}
