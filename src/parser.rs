use std::error::Error;
use std::fmt::{Display, Formatter};
use log::trace;
use crate::lexer::{Position, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Integer {
        value: i64,
        token: Token
    },
    Str {
        text: String,
        token: Token
    },
    Variable {
        name: String,
        token: Token
    },
}

impl Operand {
    /// `None` when an integer token does not hold a decimal `i64`.
    fn from_token(token: &Token) -> Option<Operand> {
        let operand = match token.kind {
            TokenKind::Integer => Operand::Integer { value: token.text.parse().ok()?, token: token.clone() },
            TokenKind::Str => Operand::Str { text: token.text.clone(), token: token.clone() },
            _ => Operand::Variable { name: token.text.clone(), token: token.clone() },
        };
        Some(operand)
    }

    pub fn token(&self) -> &Token {
        match self {
            Operand::Integer { token, .. } | Operand::Str { token, .. } | Operand::Variable { token, .. } => token,
        }
    }

    pub fn position(&self) -> &Position {
        &self.token().position
    }

    /// Short name of the operand kind, as shown by `debug`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operand::Integer { .. } => "int",
            Operand::Str { .. } => "str",
            Operand::Variable { .. } => "var",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComparisonOp {
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    Neq,
}

impl ArithmeticOp {
    fn from_kind(kind: TokenKind) -> Option<ArithmeticOp> {
        match kind {
            TokenKind::Add => Some(ArithmeticOp::Add),
            TokenKind::Sub => Some(ArithmeticOp::Sub),
            TokenKind::Mul => Some(ArithmeticOp::Mul),
            TokenKind::Div => Some(ArithmeticOp::Div),
            TokenKind::Mod => Some(ArithmeticOp::Mod),
            TokenKind::Pow => Some(ArithmeticOp::Pow),
            _ => None,
        }
    }
}

impl ComparisonOp {
    fn from_kind(kind: TokenKind) -> Option<ComparisonOp> {
        match kind {
            TokenKind::Lt => Some(ComparisonOp::Lt),
            TokenKind::Gt => Some(ComparisonOp::Gt),
            TokenKind::Lte => Some(ComparisonOp::Lte),
            TokenKind::Gte => Some(ComparisonOp::Gte),
            TokenKind::Eq => Some(ComparisonOp::Eq),
            TokenKind::Neq => Some(ComparisonOp::Neq),
            _ => None,
        }
    }

    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            ComparisonOp::Lt => lhs < rhs,
            ComparisonOp::Gt => lhs > rhs,
            ComparisonOp::Lte => lhs <= rhs,
            ComparisonOp::Gte => lhs >= rhs,
            ComparisonOp::Eq => lhs == rhs,
            ComparisonOp::Neq => lhs != rhs,
        }
    }
}

/// A jump destination as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub label: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    VarDeclValue {
        target: String,
        value: Operand
    },
    VarDeclExpr {
        target: String,
        op: ArithmeticOp,
        lhs: Operand,
        rhs: Operand
    },
    If {
        op: ComparisonOp,
        lhs: Operand,
        rhs: Operand,
        target: Target
    },
    Label {
        name: String
    },
    Goto(Target),
    End,
    Call {
        name: String,
        args: Vec<Operand>,
        position: Position
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    InvalidStatement {
        position: Position
    },
}

impl ParsingError {
    pub fn position(&self) -> &Position {
        match self {
            ParsingError::InvalidStatement { position } => position,
        }
    }
}

impl Display for ParsingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParsingError::InvalidStatement { .. } => write!(f, "invalid statement"),
        }
    }
}

impl Error for ParsingError {}

type Pattern = &'static [&'static [TokenKind]];

const OPERAND: &[TokenKind] = &[TokenKind::Integer, TokenKind::Str, TokenKind::Identifier];
const ARITHMETIC: &[TokenKind] = &[TokenKind::Add, TokenKind::Sub, TokenKind::Mul, TokenKind::Div, TokenKind::Mod, TokenKind::Pow];
const COMPARISON: &[TokenKind] = &[TokenKind::Lt, TokenKind::Gt, TokenKind::Lte, TokenKind::Gte, TokenKind::Eq, TokenKind::Neq];

const VAR_DECL_VALUE: Pattern = &[&[TokenKind::Identifier], &[TokenKind::Assign], OPERAND, &[TokenKind::EndStmt]];
const VAR_DECL_EXPR: Pattern = &[&[TokenKind::Identifier], &[TokenKind::Assign], OPERAND, ARITHMETIC, OPERAND, &[TokenKind::EndStmt]];
const IF: Pattern = &[&[TokenKind::If], OPERAND, COMPARISON, OPERAND, &[TokenKind::Goto], &[TokenKind::Identifier], &[TokenKind::EndStmt]];
const LABEL: Pattern = &[&[TokenKind::Label], &[TokenKind::EndStmt]];
const GOTO: Pattern = &[&[TokenKind::Goto], &[TokenKind::Identifier], &[TokenKind::EndStmt]];
const END: Pattern = &[&[TokenKind::End], &[TokenKind::EndStmt]];

fn matches(pattern: Pattern, tokens: &[Token]) -> bool {
    tokens.len() >= pattern.len() && pattern.iter().zip(tokens).all(|(accepted, token)| accepted.contains(&token.kind))
}

fn target(token: &Token) -> Target {
    Target { label: token.text.clone(), position: token.position.clone() }
}

/// Recognizes `[call] name operand* EOS` and returns the statement with the number of tokens it spans.
fn call(tokens: &[Token]) -> Option<(Statement, usize)> {
    let start = usize::from(tokens.first()?.kind == TokenKind::Call);
    let name = tokens.get(start).filter(|token| token.kind == TokenKind::Identifier)?;
    let args = tokens[start + 1..]
        .iter()
        .take_while(|token| OPERAND.contains(&token.kind))
        .map(Operand::from_token)
        .collect::<Option<Vec<_>>>()?;
    let end = start + 1 + args.len();
    if tokens.get(end)?.kind != TokenKind::EndStmt {
        return None;
    }
    let statement = Statement::Call { name: name.text.clone(), args, position: name.position.clone() };
    Some((statement, end + 1))
}

fn statement(tokens: &[Token]) -> Option<(Statement, usize)> {
    if matches(VAR_DECL_VALUE, tokens) {
        let statement = Statement::VarDeclValue { target: tokens[0].text.clone(), value: Operand::from_token(&tokens[2])? };
        Some((statement, VAR_DECL_VALUE.len()))
    } else if matches(VAR_DECL_EXPR, tokens) {
        let statement = Statement::VarDeclExpr {
            target: tokens[0].text.clone(),
            op: ArithmeticOp::from_kind(tokens[3].kind)?,
            lhs: Operand::from_token(&tokens[2])?,
            rhs: Operand::from_token(&tokens[4])?,
        };
        Some((statement, VAR_DECL_EXPR.len()))
    } else if matches(IF, tokens) {
        let statement = Statement::If {
            op: ComparisonOp::from_kind(tokens[2].kind)?,
            lhs: Operand::from_token(&tokens[1])?,
            rhs: Operand::from_token(&tokens[3])?,
            target: target(&tokens[5]),
        };
        Some((statement, IF.len()))
    } else if matches(LABEL, tokens) {
        Some((Statement::Label { name: tokens[0].text.clone() }, LABEL.len()))
    } else if matches(GOTO, tokens) {
        Some((Statement::Goto(target(&tokens[1])), GOTO.len()))
    } else if matches(END, tokens) {
        Some((Statement::End, END.len()))
    } else {
        call(tokens)
    }
}

pub fn parse(tokens: &[Token]) -> Result<Program, ParsingError> {
    let mut program = Program::default();
    let mut index = 0usize;
    while index < tokens.len() {
        let rest = &tokens[index..];
        if let Some((statement, length)) = statement(rest) {
            trace!("parsed {statement:?}");
            program.statements.push(statement);
            index += length;
        } else if rest[0].kind == TokenKind::EndStmt {
            index += 1;
        } else {
            return Err(ParsingError::InvalidStatement { position: rest[0].position.clone() });
        }
    }
    Ok(program)
}
