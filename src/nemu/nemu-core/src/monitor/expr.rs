//! Debugger expression language.
//!
//! A small C-like grammar over unsigned 32-bit integers, registers (`$eax`)
//! and memory dereferences (`*addr`). Evaluation is done by recursively
//! splitting the token list at its dominant operator, i.e. the operator that
//! binds loosest and is therefore applied last.

use crate::constants::NR_TOKENS;
use crate::cpu::Cpu;
use crate::error::ExprError;
use crate::memory::SwAddr;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Machine state an expression can observe
pub trait ExprContext {
    /// Value of the register called `name` (without the `$`)
    fn register(&self, name: &str) -> Option<u32>;
    /// 32-bit little-endian read, `None` when `addr` is not backed by memory
    fn read_u32(&self, addr: SwAddr) -> Option<u32>;
}

impl ExprContext for Cpu {
    fn register(&self, name: &str) -> Option<u32> {
        self.regs.read_by_name(name)
    }

    fn read_u32(&self, addr: SwAddr) -> Option<u32> {
        self.mem.checked_read(addr, 4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Hex,
    Register,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Neq,
    And,
    Or,
    Not,
    LParen,
    RParen,
    // Produced by the unary post-pass from `Minus` and `Star`
    Neg,
    Deref,
}

impl TokenKind {
    fn is_operand(self) -> bool {
        matches!(self, TokenKind::Number | TokenKind::Hex | TokenKind::Register)
    }

    fn is_unary(self) -> bool {
        matches!(self, TokenKind::Not | TokenKind::Neg | TokenKind::Deref)
    }

    /// Binding strength; the lowest value is the dominant operator
    fn priority(self) -> Option<u8> {
        let priority = match self {
            TokenKind::Or => 1,
            TokenKind::And => 2,
            TokenKind::Eq | TokenKind::Neq => 3,
            TokenKind::Plus | TokenKind::Minus => 4,
            TokenKind::Star | TokenKind::Slash => 5,
            TokenKind::Not | TokenKind::Neg | TokenKind::Deref => 6,
            _ => return None,
        };
        Some(priority)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text for numbers and registers, empty for operators
    pub text: String,
}

/// Tokenizer rules, tried in order. Longer operators come before their
/// prefixes and hex literals before decimals. `None` marks skipped input.
static RULES: LazyLock<Vec<(Regex, Option<TokenKind>)>> = LazyLock::new(|| {
    let rules: [(&str, Option<TokenKind>); 15] = [
        (r"\s+", None),
        (r"==", Some(TokenKind::Eq)),
        (r"!=", Some(TokenKind::Neq)),
        (r"&&", Some(TokenKind::And)),
        (r"\|\|", Some(TokenKind::Or)),
        (r"\+", Some(TokenKind::Plus)),
        (r"-", Some(TokenKind::Minus)),
        (r"\*", Some(TokenKind::Star)),
        (r"/", Some(TokenKind::Slash)),
        (r"!", Some(TokenKind::Not)),
        (r"\(", Some(TokenKind::LParen)),
        (r"\)", Some(TokenKind::RParen)),
        (r"0[xX][0-9a-fA-F]+", Some(TokenKind::Hex)),
        (r"[0-9]+", Some(TokenKind::Number)),
        (r"\$[a-zA-Z]+", Some(TokenKind::Register)),
    ];
    rules
        .iter()
        .map(|(pattern, kind)| {
            let anchored = format!("^(?:{})", pattern);
            (
                Regex::new(&anchored).expect("tokenizer rule must compile"),
                *kind,
            )
        })
        .collect()
});

/// Split `e` into tokens, reclassifying unary `-` and `*`
pub fn make_token(e: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut position = 0;

    while position < e.len() {
        let rest = &e[position..];
        let matched = RULES
            .iter()
            .enumerate()
            .find_map(|(i, (re, kind))| re.find(rest).map(|m| (i, m.end(), *kind)));

        let (rule, len, kind) = match matched {
            Some(found) => found,
            None => {
                debug!(
                    "no match at position {}\n{}\n{:>width$}",
                    position,
                    e,
                    "^",
                    width = position + 1
                );
                return Err(ExprError::NoMatch { position });
            }
        };
        debug!(
            "match rules[{}] at position {} with len {}: {}",
            rule,
            position,
            len,
            &rest[..len]
        );

        if let Some(kind) = kind {
            if tokens.len() == NR_TOKENS {
                return Err(ExprError::TooManyTokens(NR_TOKENS));
            }
            let text = if kind.is_operand() {
                rest[..len].to_string()
            } else {
                String::new()
            };
            tokens.push(Token { kind, text });
        }
        position += len;
    }

    // `-` and `*` are unary unless they follow something that ends an operand
    for i in 0..tokens.len() {
        let unary = i == 0 || {
            let prev = tokens[i - 1].kind;
            !(prev == TokenKind::RParen || prev.is_operand())
        };
        if unary {
            match tokens[i].kind {
                TokenKind::Minus => tokens[i].kind = TokenKind::Neg,
                TokenKind::Star => tokens[i].kind = TokenKind::Deref,
                _ => {}
            }
        }
    }

    Ok(tokens)
}

struct Evaluator<'a, C: ExprContext + ?Sized> {
    tokens: &'a [Token],
    ctx: &'a C,
}

impl<'a, C: ExprContext + ?Sized> Evaluator<'a, C> {
    /// True when tokens[p] and tokens[q] are a matching pair of parentheses
    fn check_parentheses(&self, p: usize, q: usize) -> bool {
        if self.tokens[p].kind != TokenKind::LParen || self.tokens[q].kind != TokenKind::RParen {
            return false;
        }
        let mut depth = 0i32;
        for (i, token) in self.tokens[p..=q].iter().enumerate() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                _ => {}
            }
            // the opening parenthesis closes before the end
            if depth == 0 && p + i != q {
                return false;
            }
        }
        true
    }

    /// Index of the operator applied last within tokens[p..=q]
    fn dominant_operator(&self, p: usize, q: usize) -> Result<Option<usize>, ExprError> {
        let mut depth = 0i32;
        let mut best: Option<(usize, u8)> = None;

        for i in p..=q {
            let kind = self.tokens[i].kind;
            match kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(ExprError::UnmatchedParen);
                    }
                }
                _ if depth > 0 => {}
                _ => {
                    if let Some(priority) = kind.priority() {
                        let replace = match best {
                            None => true,
                            Some((_, current)) if priority < current => true,
                            // ties: rightmost binary operator, leftmost unary one
                            Some((_, current)) => priority == current && !kind.is_unary(),
                        };
                        if replace {
                            best = Some((i, priority));
                        }
                    }
                }
            }
        }

        if depth != 0 {
            return Err(ExprError::UnmatchedParen);
        }
        Ok(best.map(|(i, _)| i))
    }

    fn operand(&self, token: &Token) -> Result<u32, ExprError> {
        match token.kind {
            TokenKind::Number => token
                .text
                .parse::<u32>()
                .map_err(|_| ExprError::BadLiteral(token.text.clone())),
            TokenKind::Hex => u32::from_str_radix(&token.text[2..], 16)
                .map_err(|_| ExprError::BadLiteral(token.text.clone())),
            TokenKind::Register => {
                let name = &token.text[1..];
                self.ctx
                    .register(name)
                    .ok_or_else(|| ExprError::UnknownRegister(name.to_string()))
            }
            _ => Err(ExprError::BadExpression),
        }
    }

    fn eval(&self, p: usize, q: usize) -> Result<u32, ExprError> {
        if p > q {
            return Err(ExprError::EmptyOperand);
        }
        if p == q {
            return self.operand(&self.tokens[p]);
        }
        if self.check_parentheses(p, q) {
            return self.eval(p + 1, q - 1);
        }

        let op = self
            .dominant_operator(p, q)?
            .ok_or(ExprError::BadExpression)?;
        let kind = self.tokens[op].kind;

        if kind.is_unary() {
            // a unary operator has nothing on its left
            if op != p {
                return Err(ExprError::BadExpression);
            }
            let value = self.eval(op + 1, q)?;
            return match kind {
                TokenKind::Not => Ok((value == 0) as u32),
                TokenKind::Neg => Ok(value.wrapping_neg()),
                _ => self.ctx.read_u32(value).ok_or(ExprError::BadAddress(value)),
            };
        }

        if op == p || op == q {
            return Err(ExprError::EmptyOperand);
        }
        let val1 = self.eval(p, op - 1)?;
        let val2 = self.eval(op + 1, q)?;

        match kind {
            TokenKind::Plus => Ok(val1.wrapping_add(val2)),
            TokenKind::Minus => Ok(val1.wrapping_sub(val2)),
            TokenKind::Star => Ok(val1.wrapping_mul(val2)),
            TokenKind::Slash => val1.checked_div(val2).ok_or(ExprError::DivideByZero),
            TokenKind::Eq => Ok((val1 == val2) as u32),
            TokenKind::Neq => Ok((val1 != val2) as u32),
            TokenKind::And => Ok((val1 != 0 && val2 != 0) as u32),
            TokenKind::Or => Ok((val1 != 0 || val2 != 0) as u32),
            _ => Err(ExprError::BadExpression),
        }
    }
}

/// Evaluate `e` against the machine state in `ctx`
pub fn expr<C: ExprContext + ?Sized>(e: &str, ctx: &C) -> Result<u32, ExprError> {
    let tokens = make_token(e)?;
    if tokens.is_empty() {
        return Err(ExprError::EmptyOperand);
    }

    let mut depth = 0i32;
    for token in tokens.iter() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(ExprError::UnmatchedParen);
        }
    }
    if depth != 0 {
        return Err(ExprError::UnmatchedParen);
    }

    Evaluator {
        tokens: &tokens,
        ctx,
    }
    .eval(0, tokens.len() - 1)
}

#[cfg(test)]
mod expr_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Machine {
        regs: HashMap<&'static str, u32>,
        mem: HashMap<u32, u32>,
    }

    impl ExprContext for Machine {
        fn register(&self, name: &str) -> Option<u32> {
            self.regs.get(name).copied()
        }

        fn read_u32(&self, addr: SwAddr) -> Option<u32> {
            self.mem.get(&addr).copied()
        }
    }

    fn eval(e: &str) -> Result<u32, ExprError> {
        let mut machine = Machine::default();
        machine.regs.insert("eax", 0x10);
        machine.regs.insert("ebx", 3);
        machine.mem.insert(0x100, 0xDEAD_BEEF);
        machine.mem.insert(0x10, 0x100);
        expr(e, &machine)
    }

    #[test]
    fn test_tokenizer_kinds() {
        let tokens = make_token("0x1F + $eax*-3 != 2").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Hex,
                TokenKind::Plus,
                TokenKind::Register,
                TokenKind::Star,
                TokenKind::Neg,
                TokenKind::Number,
                TokenKind::Neq,
                TokenKind::Number,
            ]
        );
        assert_eq!(tokens[0].text, "0x1F");
        assert_eq!(tokens[2].text, "$eax");
        assert!(tokens[1].text.is_empty());
    }

    #[test]
    fn test_tokenizer_operator_prefixes() {
        let kinds: Vec<TokenKind> = make_token("!1 != !0 && 1 || 0 == 0")
            .unwrap()
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Not,
                TokenKind::Number,
                TokenKind::Neq,
                TokenKind::Not,
                TokenKind::Number,
                TokenKind::And,
                TokenKind::Number,
                TokenKind::Or,
                TokenKind::Number,
                TokenKind::Eq,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_tokenizer_no_match() {
        assert_eq!(make_token("1 + @"), Err(ExprError::NoMatch { position: 4 }));
        // a lone '=' is not a token
        assert_eq!(make_token("1 = 1"), Err(ExprError::NoMatch { position: 2 }));
    }

    #[test]
    fn test_unary_reclassification() {
        let kinds: Vec<TokenKind> = make_token("*(1) * *2 - (-3)")
            .unwrap()
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Deref,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Star,
                TokenKind::Deref,
                TokenKind::Number,
                TokenKind::Minus,
                TokenKind::LParen,
                TokenKind::Neg,
                TokenKind::Number,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2 + 3 * 4"), Ok(14));
        assert_eq!(eval("(2 + 3) * 4"), Ok(20));
        assert_eq!(eval("1 + 2 == 3 && 4 != 5"), Ok(1));
        assert_eq!(eval("0 || 2 == 2 && 0"), Ok(0));
        assert_eq!(eval("1 || 0 && 0"), Ok(1));
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(eval("10 - 4 - 3"), Ok(3));
        assert_eq!(eval("100 / 10 / 5"), Ok(2));
        assert_eq!(eval("8 / 2 * 4"), Ok(16));
        assert_eq!(eval("1 == 1 == 1"), Ok(1));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval("-3 + 5"), Ok(2));
        assert_eq!(eval("4 - -3"), Ok(7));
        assert_eq!(eval("- - 3"), Ok(3));
        assert_eq!(eval("!0"), Ok(1));
        assert_eq!(eval("!7"), Ok(0));
        assert_eq!(eval("!!7"), Ok(1));
        assert_eq!(eval("-1"), Ok(0xFFFF_FFFF));
        assert_eq!(eval("2 * -(1 + 2)"), Ok(0xFFFF_FFFA));
    }

    #[test]
    fn test_registers_and_memory() {
        assert_eq!(eval("$eax + $ebx"), Ok(0x13));
        assert_eq!(eval("*0x100"), Ok(0xDEAD_BEEF));
        assert_eq!(eval("**$eax"), Ok(0xDEAD_BEEF));
        assert_eq!(eval("*$eax + 1"), Ok(0x101));
        assert_eq!(eval("*($eax + 0xF0) == 0xdeadbeef"), Ok(1));
        assert_eq!(eval("*4"), Err(ExprError::BadAddress(4)));
        assert_eq!(
            eval("$ecx"),
            Err(ExprError::UnknownRegister("ecx".to_string()))
        );
    }

    #[test]
    fn test_wraparound() {
        assert_eq!(eval("0xFFFFFFFF + 1"), Ok(0));
        assert_eq!(eval("0 - 1"), Ok(0xFFFF_FFFF));
        assert_eq!(eval("0x80000000 * 2"), Ok(0));
    }

    #[test]
    fn test_failures() {
        assert_eq!(eval("5 / 0"), Err(ExprError::DivideByZero));
        assert_eq!(eval("(1 + 2"), Err(ExprError::UnmatchedParen));
        assert_eq!(eval("1 + 2)"), Err(ExprError::UnmatchedParen));
        assert_eq!(eval(")1("), Err(ExprError::UnmatchedParen));
        assert_eq!(eval("1 +"), Err(ExprError::EmptyOperand));
        assert_eq!(eval("()"), Err(ExprError::EmptyOperand));
        assert_eq!(eval(""), Err(ExprError::EmptyOperand));
        assert_eq!(eval("   "), Err(ExprError::EmptyOperand));
        assert_eq!(eval("1 2"), Err(ExprError::BadExpression));
        assert_eq!(eval("3 !4"), Err(ExprError::BadExpression));
        assert_eq!(
            eval("99999999999"),
            Err(ExprError::BadLiteral("99999999999".to_string()))
        );
    }

    #[test]
    fn test_token_limit() {
        // 16 operands and 15 operators
        let widest = vec!["1"; 16].join(" + ");
        assert_eq!(eval(&widest), Ok(16));

        let nested = format!("{}1{}", "(".repeat(NR_TOKENS), ")".repeat(NR_TOKENS));
        assert_eq!(eval(&nested), Err(ExprError::TooManyTokens(NR_TOKENS)));
        let wide = vec!["1"; NR_TOKENS].join("+");
        assert_eq!(make_token(&wide), Err(ExprError::TooManyTokens(NR_TOKENS)));
    }

    #[test]
    fn test_parentheses_not_stripped_when_unbalanced_inside() {
        assert_eq!(eval("(1 + 2) * (3 + 4)"), Ok(21));
        assert_eq!(eval("((2))"), Ok(2));
    }

    proptest! {
        #[test]
        fn binary_ops_wrap(a in any::<u32>(), b in any::<u32>()) {
            let machine = Machine::default();
            prop_assert_eq!(expr(&format!("{} + {}", a, b), &machine), Ok(a.wrapping_add(b)));
            prop_assert_eq!(expr(&format!("{} - {}", a, b), &machine), Ok(a.wrapping_sub(b)));
            prop_assert_eq!(expr(&format!("{:#x} * {:#x}", a, b), &machine), Ok(a.wrapping_mul(b)));
            prop_assert_eq!(expr(&format!("{} == {}", a, b), &machine), Ok((a == b) as u32));
            prop_assert_eq!(expr(&format!("{} != {}", a, b), &machine), Ok((a != b) as u32));
            prop_assert_eq!(expr(&format!("{} && {}", a, b), &machine), Ok((a != 0 && b != 0) as u32));
            prop_assert_eq!(expr(&format!("{} || {}", a, b), &machine), Ok((a != 0 || b != 0) as u32));
            let quotient = expr(&format!("{} / {}", a, b), &machine);
            if b == 0 {
                prop_assert_eq!(quotient, Err(ExprError::DivideByZero));
            } else {
                prop_assert_eq!(quotient, Ok(a / b));
            }
        }
    }
}
