//! TAC opcode definitions.
//!
//! The CFG handed to us is three-address code lifted from EVM bytecode, so the
//! mnemonics are the EVM ones minus the stack shuffling (`PUSHn`/`DUPn`/`SWAPn`)
//! plus a handful of lifter-specific operations (`CONST`, `PHI`,
//! `CALLPRIVATE`, `RETURNPRIVATE`, `THROW`).

use crate::errors::LoaderError;
use std::fmt;
use std::str::FromStr;

/// Coarse grouping of opcodes, used by the resolver to pick a handling rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Arithmetic,
    /// Comparison, boolean and bitwise logic.
    Comparison,
    Hash,
    Environment,
    MemoryAccess,
    StorageAccess,
    ControlTransfer,
    Halt,
    Call,
    Log,
    /// `CONST`: the lifted form of `PUSHn`.
    ConstantPush,
    /// Lifter-inserted SSA merge marker, not a machine opcode.
    PhiJoin,
    Other,
}

macro_rules! opcodes {
    ($($variant:ident => $name:literal, $cat:ident;)*) => {
        /// A TAC operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Upper-case mnemonic, as it appears in the CFG export.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $(Opcode::$variant => Category::$cat,)*
                }
            }

            fn from_upper(s: &str) -> Option<Opcode> {
                match s {
                    $($name => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    // -- Stop and Arithmetic -----------------------------------------------
    Stop           => "STOP",           Halt;
    Add            => "ADD",            Arithmetic;
    Mul            => "MUL",            Arithmetic;
    Sub            => "SUB",            Arithmetic;
    Div            => "DIV",            Arithmetic;
    SDiv           => "SDIV",           Arithmetic;
    Mod            => "MOD",            Arithmetic;
    SMod           => "SMOD",           Arithmetic;
    AddMod         => "ADDMOD",         Arithmetic;
    MulMod         => "MULMOD",         Arithmetic;
    Exp            => "EXP",            Arithmetic;
    SignExtend     => "SIGNEXTEND",     Arithmetic;

    // -- Comparison and Bitwise Logic --------------------------------------
    Lt             => "LT",             Comparison;
    Gt             => "GT",             Comparison;
    SLt            => "SLT",            Comparison;
    SGt            => "SGT",            Comparison;
    Eq             => "EQ",             Comparison;
    IsZero         => "ISZERO",         Comparison;
    And            => "AND",            Comparison;
    Or             => "OR",             Comparison;
    Xor            => "XOR",            Comparison;
    Not            => "NOT",            Comparison;
    Byte           => "BYTE",           Comparison;
    Shl            => "SHL",            Comparison;
    Shr            => "SHR",            Comparison;
    Sar            => "SAR",            Comparison;

    // -- SHA3 --------------------------------------------------------------
    Sha3           => "SHA3",           Hash;

    // -- Environment and Block Information ---------------------------------
    Address        => "ADDRESS",        Environment;
    Balance        => "BALANCE",        Environment;
    Origin         => "ORIGIN",         Environment;
    Caller         => "CALLER",         Environment;
    CallValue      => "CALLVALUE",      Environment;
    CallDataLoad   => "CALLDATALOAD",   Environment;
    CallDataSize   => "CALLDATASIZE",   Environment;
    CallDataCopy   => "CALLDATACOPY",   MemoryAccess;
    CodeSize       => "CODESIZE",       Environment;
    CodeCopy       => "CODECOPY",       MemoryAccess;
    GasPrice       => "GASPRICE",       Environment;
    ExtCodeSize    => "EXTCODESIZE",    Environment;
    ExtCodeCopy    => "EXTCODECOPY",    MemoryAccess;
    ReturnDataSize => "RETURNDATASIZE", Environment;
    ReturnDataCopy => "RETURNDATACOPY", MemoryAccess;
    ExtCodeHash    => "EXTCODEHASH",    Environment;
    BlockHash      => "BLOCKHASH",      Environment;
    Coinbase       => "COINBASE",       Environment;
    Timestamp      => "TIMESTAMP",      Environment;
    Number         => "NUMBER",         Environment;
    Difficulty     => "DIFFICULTY",     Environment;
    GasLimit       => "GASLIMIT",       Environment;
    ChainId        => "CHAINID",        Environment;
    SelfBalance    => "SELFBALANCE",    Environment;
    BaseFee        => "BASEFEE",        Environment;
    BlobHash       => "BLOBHASH",       Environment;
    BlobBaseFee    => "BLOBBASEFEE",    Environment;
    Pc             => "PC",             Environment;
    MSize          => "MSIZE",          Environment;
    Gas            => "GAS",            Environment;

    // -- Memory, Storage and Flow ------------------------------------------
    Pop            => "POP",            Other;
    MLoad          => "MLOAD",          MemoryAccess;
    MStore         => "MSTORE",         MemoryAccess;
    MStore8        => "MSTORE8",        MemoryAccess;
    MCopy          => "MCOPY",          MemoryAccess;
    SLoad          => "SLOAD",          StorageAccess;
    SStore         => "SSTORE",         StorageAccess;
    TLoad          => "TLOAD",          StorageAccess;
    TStore         => "TSTORE",         StorageAccess;
    Jump           => "JUMP",           ControlTransfer;
    JumpI          => "JUMPI",          ControlTransfer;
    JumpDest       => "JUMPDEST",       Other;

    // -- Logging -----------------------------------------------------------
    Log0           => "LOG0",           Log;
    Log1           => "LOG1",           Log;
    Log2           => "LOG2",           Log;
    Log3           => "LOG3",           Log;
    Log4           => "LOG4",           Log;

    // -- System operations -------------------------------------------------
    Create         => "CREATE",         Call;
    Call           => "CALL",           Call;
    CallCode       => "CALLCODE",       Call;
    Return         => "RETURN",         Halt;
    DelegateCall   => "DELEGATECALL",   Call;
    Create2        => "CREATE2",        Call;
    StaticCall     => "STATICCALL",     Call;
    Revert         => "REVERT",         Halt;
    Invalid        => "INVALID",        Halt;
    SelfDestruct   => "SELFDESTRUCT",   Halt;

    // -- Lifter-specific ---------------------------------------------------
    Const          => "CONST",          ConstantPush;
    Phi            => "PHI",            PhiJoin;
    CallPrivate    => "CALLPRIVATE",    Call;
    ReturnPrivate  => "RETURNPRIVATE",  Halt;
    Throw          => "THROW",          Halt;
}

impl Opcode {
    pub fn is_control_transfer(self) -> bool {
        self.category() == Category::ControlTransfer
    }

    pub fn is_conditional_branch(self) -> bool {
        self == Opcode::JumpI
    }

    /// Writes the resolver does not track backwards.
    pub fn is_untracked_store(self) -> bool {
        matches!(
            self,
            Opcode::MStore | Opcode::MStore8 | Opcode::SStore | Opcode::TStore
        )
    }

    /// Calls whose result the resolver replaces with an opaque marker.
    pub fn is_opaque_call(self) -> bool {
        matches!(self, Opcode::CallPrivate | Opcode::StaticCall)
    }

    /// Operators rendered with the `(L OP R)` / `(OP x)` operator forms.
    pub fn is_operator(self) -> bool {
        matches!(self.category(), Category::Arithmetic | Category::Comparison)
    }
}

impl FromStr for Opcode {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::from_upper(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| LoaderError::UnknownOpcode(s.to_string()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
