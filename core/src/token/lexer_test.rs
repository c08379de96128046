use super::*;

fn toks(src: &str) -> Vec<Token> {
    Tokenizer::tokenize(src).unwrap().tokens
}

#[test]
fn punctuation_and_operators() {
    assert_eq!(
        toks("a === b !== c >>> 2"),
        vec![
            Token::Id("a".into()),
            Token::StrictEq,
            Token::Id("b".into()),
            Token::StrictNe,
            Token::Id("c".into()),
            Token::UShr,
            Token::Num(2.0),
        ]
    );
    assert_eq!(
        toks("x ??= y?.z"),
        vec![
            Token::Id("x".into()),
            Token::NullishAssign,
            Token::Id("y".into()),
            Token::OptionalDot,
            Token::Id("z".into()),
        ]
    );
    // `?.` followed by a digit is a ternary with a fractional literal
    assert_eq!(
        toks("a?.5:b"),
        vec![
            Token::Id("a".into()),
            Token::Question,
            Token::Num(0.5),
            Token::Colon,
            Token::Id("b".into()),
        ]
    );
}

#[test]
fn numbers() {
    assert_eq!(toks("0x10"), vec![Token::Num(16.0)]);
    assert_eq!(toks("0b101"), vec![Token::Num(5.0)]);
    assert_eq!(toks("1_000"), vec![Token::Num(1000.0)]);
    assert_eq!(toks("1.5e2"), vec![Token::Num(150.0)]);
    assert_eq!(toks(".25"), vec![Token::Num(0.25)]);
    assert!(Tokenizer::tokenize("10n").is_err());
}

#[test]
fn strings_and_escapes() {
    assert_eq!(toks(r#"'a\'b'"#), vec![Token::Str("a'b".into())]);
    assert_eq!(toks(r#""x\n\t\\""#), vec![Token::Str("x\n\t\\".into())]);
    assert_eq!(toks(r#""\x41B""#), vec![Token::Str("AB".into())]);
    assert_eq!(toks(r#""\u{1F600}""#), vec![Token::Str("\u{1F600}".into())]);
    assert!(Tokenizer::tokenize("'unterminated").is_err());
}

#[test]
fn template_literals_are_raw() {
    assert_eq!(toks("`a${x + 1}b`"), vec![Token::Template("`a${x + 1}b`".into())]);
    // nested template and a brace inside a string must not unbalance
    assert_eq!(
        toks("`a${`in${y}ner` + \"}\"}b`"),
        vec![Token::Template("`a${`in${y}ner` + \"}\"}b`".into())]
    );
}

#[test]
fn regex_vs_division() {
    assert_eq!(
        toks("a / b"),
        vec![Token::Id("a".into()), Token::Div, Token::Id("b".into())]
    );
    assert_eq!(
        toks("x = /ab[/]c/g"),
        vec![
            Token::Id("x".into()),
            Token::Assign,
            Token::Regex("/ab[/]c/g".into()),
        ]
    );
    assert_eq!(
        toks("return /x/.test(s)"),
        vec![
            Token::Return,
            Token::Regex("/x/".into()),
            Token::Dot,
            Token::Id("test".into()),
            Token::LParen,
            Token::Id("s".into()),
            Token::RParen,
        ]
    );
}

#[test]
fn newline_before_flags() {
    let ts = Tokenizer::tokenize("return\n42").unwrap();
    assert_eq!(ts.tokens, vec![Token::Return, Token::Num(42.0)]);
    assert_eq!(ts.newline_before, vec![false, true]);

    let ts = Tokenizer::tokenize("a /*\n*/ b").unwrap();
    assert_eq!(ts.newline_before, vec![false, true]);
}

#[test]
fn spans_use_zero_based_columns() {
    let ts = Tokenizer::tokenize("ab cd").unwrap();
    assert_eq!(ts.spans[0].start, Position::new(1, 0, 0));
    assert_eq!(ts.spans[1].start, Position::new(1, 3, 3));
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        toks("a // line\n/* block */ b"),
        vec![Token::Id("a".into()), Token::Id("b".into())]
    );
    assert!(Tokenizer::tokenize("/* open").is_err());
}
