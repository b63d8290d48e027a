use crate::memory::SwAddr;
use thiserror::Error;

/// Recoverable failures of the expression evaluator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("no match at position {position}")]
    NoMatch { position: usize },
    #[error("expression has more than {0} tokens")]
    TooManyTokens(usize),
    #[error("unmatched parentheses")]
    UnmatchedParen,
    #[error("missing operand")]
    EmptyOperand,
    #[error("malformed expression")]
    BadExpression,
    #[error("invalid literal '{0}'")]
    BadLiteral(String),
    #[error("unknown register '${0}'")]
    UnknownRegister(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("cannot access memory at address 0x{0:08x}")]
    BadAddress(SwAddr),
}

/// Failures reported by the watchpoint pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("no free watchpoint")]
    PoolExhausted,
    #[error("expression longer than {0} bytes")]
    ExpressionTooLong(usize),
    #[error("bad expression: {0}")]
    Expr(#[from] ExprError),
    #[error("watchpoint {0} not found")]
    NotFound(usize),
}

/// Instruction level faults; these stop emulation instead of aborting it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecFault {
    #[error("invalid opcode 0x{opcode:02x} at eip = 0x{eip:08x}")]
    InvalidOpcode { eip: SwAddr, opcode: u8 },
    #[error("unsupported operand form (modrm 0x{modrm:02x}) at eip = 0x{eip:08x}")]
    UnsupportedOperand { eip: SwAddr, modrm: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("unknown register '{0}'")]
    Unknown(String),
}
