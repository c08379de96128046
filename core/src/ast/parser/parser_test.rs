use crate::ast::{self, ExprKind, StmtKind};

#[test]
fn parses_locs_for_statements() {
    let program = ast::parse("f();\n  g();").unwrap();
    assert_eq!(program.body.len(), 2);
    let loc0 = program.body[0].loc.as_ref().unwrap();
    assert_eq!((loc0.line, loc0.column), (1, 0));
    let loc1 = program.body[1].loc.as_ref().unwrap();
    assert_eq!((loc1.line, loc1.column), (2, 2));
}

#[test]
fn conditional_branch_locs_are_their_own() {
    let program = ast::parse("x ? aaa : bbb;").unwrap();
    let StmtKind::Expr(expr) = &program.body[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Conditional { consequent, alternate, .. } = &expr.kind else {
        panic!("expected conditional");
    };
    assert_eq!(consequent.loc.as_ref().unwrap().column, 4);
    assert_eq!(alternate.loc.as_ref().unwrap().column, 10);
}

#[test]
fn asi_inserts_semicolons() {
    let program = ast::parse("a()\nb()").unwrap();
    assert_eq!(program.body.len(), 2);

    // restricted production: return value must be on the same line
    let program = ast::parse("function f() { return\n42; }").unwrap();
    let StmtKind::FuncDecl(function) = &program.body[0].kind else {
        panic!("expected function");
    };
    assert!(matches!(function.body[0].kind, StmtKind::Return(None)));
    assert!(matches!(function.body[1].kind, StmtKind::Expr(_)));
}

#[test]
fn fail_fast_on_unsupported_syntax() {
    assert!(ast::parse("import x from 'y';").is_err());
    assert!(ast::parse("export const a = 1;").is_err());
    assert!(ast::parse("with (o) { f(); }").is_err());
    assert!(ast::parse("var {a} = o;").is_err());
    assert!(ast::parse("var [a] = xs;").is_err());
    assert!(ast::parse("function f({a}) {}").is_err());
    assert!(ast::parse("[a, b] = xs;").is_err());
    assert!(ast::parse("class A { x = 1; }").is_err());
    assert!(ast::parse("new.target;").is_err());
    assert!(ast::parse("tag`x`;").is_err());
}

#[test]
fn defaults_are_supported_targets() {
    let program = ast::parse("function f(a = 1, ...rest) { return a; }").unwrap();
    let StmtKind::FuncDecl(function) = &program.body[0].kind else {
        panic!("expected function");
    };
    assert_eq!(function.params.len(), 2);
    assert!(function.params[0].default.is_some());
    assert!(function.params[1].rest);
}

#[test]
fn arrow_lookahead() {
    let program = ast::parse("x = (a, b) => a + b;").unwrap();
    let StmtKind::Expr(expr) = &program.body[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Arrow(_)));

    // a parenthesized sequence is not an arrow
    let program = ast::parse("x = (a, b);").unwrap();
    let StmtKind::Expr(expr) = &program.body[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Sequence(_)));
}

#[test]
fn keywords_as_member_names() {
    assert!(ast::parse("p.catch(f).finally(g);").is_ok());
    assert!(ast::parse("x = { default: 1, new: 2 };").is_ok());
    assert!(ast::parse("a.delete();").is_ok());
}

#[test]
fn async_is_contextual() {
    assert!(ast::parse("async();").is_ok());
    assert!(ast::parse("x = async () => 1;").is_ok());
    assert!(ast::parse("async function f() {}").is_ok());
}
