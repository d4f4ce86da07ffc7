// Formula parser - converts formula strings into AST
// Grammar: numbers, function calls, coordinate tuples (for sum_cells),
// basic math (+, -, *, /), parentheses, unary minus.

/// Expression AST for the restricted verification language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Function call, e.g. `sum_col(1, 1, 0, 1)`.
    Call { name: String, args: Vec<Expr> },
    /// Parenthesized comma list, e.g. `(0, 1, 2)`. Only meaningful as a
    /// coordinate argument to `sum_cells`; rejected anywhere else at eval.
    Tuple(Vec<Expr>),
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parse a formula string into an AST.
pub fn parse(formula: &str) -> Result<Expr, String> {
    let input = formula.trim();
    if input.is_empty() {
        return Err("Empty formula".to_string());
    }
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err(format!("Unexpected token at position {pos}"));
    }
    Ok(expr)
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text
                    .parse()
                    .map_err(|_| format!("Invalid number '{text}'"))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text.to_ascii_lowercase()));
            }
            _ => return Err(format!("Unexpected character '{c}'")),
        }
    }

    Ok(tokens)
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        match &tokens[pos] {
            Token::Plus => {
                let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
                left = Expr::BinaryOp {
                    op: Op::Add,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                pos = new_pos;
            }
            Token::Minus => {
                let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
                left = Expr::BinaryOp {
                    op: Op::Sub,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                pos = new_pos;
            }
            _ => break,
        }
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        match &tokens[pos] {
            Token::Star => {
                let (right, new_pos) = parse_unary(tokens, pos + 1)?;
                left = Expr::BinaryOp {
                    op: Op::Mul,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                pos = new_pos;
            }
            Token::Slash => {
                let (right, new_pos) = parse_unary(tokens, pos + 1)?;
                left = Expr::BinaryOp {
                    op: Op::Div,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                pos = new_pos;
            }
            _ => break,
        }
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos < tokens.len() {
        if let Token::Minus = &tokens[pos] {
            let (inner, new_pos) = parse_unary(tokens, pos + 1)?;
            return Ok((Expr::Neg(Box::new(inner)), new_pos));
        }
    }
    parse_primary(tokens, pos)
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("Unexpected end of expression".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::Ident(name) => {
            // The only identifiers in the grammar are function names.
            if pos + 1 >= tokens.len() || !matches!(tokens[pos + 1], Token::LParen) {
                return Err(format!("'{name}' is not callable without arguments"));
            }
            let (args, new_pos) = parse_paren_list(tokens, pos + 1)?;
            Ok((
                Expr::Call {
                    name: name.clone(),
                    args,
                },
                new_pos,
            ))
        }
        Token::LParen => {
            let (items, new_pos) = parse_paren_list(tokens, pos)?;
            match items.len() {
                0 => Err("Empty parentheses".to_string()),
                1 => Ok((items.into_iter().next().unwrap(), new_pos)),
                _ => Ok((Expr::Tuple(items), new_pos)),
            }
        }
        _ => Err(format!("Unexpected token at position {pos}")),
    }
}

/// Parse `( expr , expr , ... )` starting at the opening paren. Returns the
/// comma-separated expressions and the position after the closing paren.
fn parse_paren_list(tokens: &[Token], pos: usize) -> Result<(Vec<Expr>, usize), String> {
    debug_assert!(matches!(tokens[pos], Token::LParen));
    let mut pos = pos + 1;
    let mut items = Vec::new();

    if pos < tokens.len() {
        if let Token::RParen = &tokens[pos] {
            return Ok((items, pos + 1));
        }
    }

    loop {
        let (item, new_pos) = parse_add_sub(tokens, pos)?;
        items.push(item);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::Comma) => pos += 1,
            Some(Token::RParen) => return Ok((items, pos + 1)),
            _ => return Err("Expected ',' or ')'".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number() {
        assert_eq!(parse("42.5").unwrap(), Expr::Number(42.5));
    }

    #[test]
    fn parses_arithmetic_with_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::BinaryOp { op: Op::Add, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: Op::Mul, .. }));
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn parses_call_with_args() {
        let expr = parse("sum_col(1, 1, 0, 1)").unwrap();
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "sum_col");
                assert_eq!(args.len(), 4);
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn parses_tuple_args_for_sum_cells() {
        let expr = parse("sum_cells((0, 1, 2), (1, 0, 1))").unwrap();
        match expr {
            Expr::Call { name, args } => {
                assert_eq!(name, "sum_cells");
                assert!(matches!(args[0], Expr::Tuple(ref t) if t.len() == 3));
                assert!(matches!(args[1], Expr::Tuple(ref t) if t.len() == 3));
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn parses_unary_minus() {
        assert_eq!(
            parse("-3").unwrap(),
            Expr::Neg(Box::new(Expr::Number(3.0)))
        );
    }

    #[test]
    fn function_names_case_insensitive() {
        let expr = parse("ABS(1)").unwrap();
        assert!(matches!(expr, Expr::Call { ref name, .. } if name == "abs"));
    }

    #[test]
    fn rejects_bare_identifier() {
        assert!(parse("revenue").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("1 + 2 )").is_err());
    }

    #[test]
    fn rejects_unknown_character() {
        assert!(parse("1 @ 2").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }
}
