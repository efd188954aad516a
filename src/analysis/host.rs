//! The boundary between the loader and the analysis environment hosting it.
//!
//! The loader decodes structures on its own, but a few of its steps need a disassembler and a
//! symbol database it does not provide: the Visual Basic decompiler needs the first instructions
//! of the entry point, and the dialog procedure search needs call sites. Everything it learns is
//! reported back the same way, as function marks, names, text marks and cross-references.
//!
//! [`Host`] captures both directions. [`crate::analysis::Recorder`] is the in-memory
//! implementation used when no real environment is attached.

use strum::{Display, EnumIter};

use crate::pe::{
    headers::{MACHINE_AMD64, MACHINE_ARM, MACHINE_ARM64, MACHINE_ARMNT, MACHINE_I386},
    Bitness,
};

/// Kind of a symbol handed to [`Host::set_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SymbolKind {
    /// Code entry point
    Function,
    /// Function exported by the image
    Export,
    /// Import address table cell
    Import,
    /// String data
    String,
    /// Any other data
    Data,
}

/// Instruction set profile the host should disassemble the image with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Processor {
    /// IA-32
    #[strum(serialize = "x86_32")]
    X86_32,
    /// AMD64
    #[strum(serialize = "x86_64")]
    X86_64,
    /// 32-bit ARM, little endian
    #[strum(serialize = "arm32le")]
    Arm32Le,
    /// AArch64, little endian
    #[strum(serialize = "arm64le")]
    Arm64Le,
    /// ECMA-335 common intermediate language
    #[strum(serialize = "cil")]
    Cil,
}

impl Processor {
    /// The profile for a file header machine value.
    ///
    /// ARM images with a PE32+ optional header are treated as AArch64.
    #[must_use]
    pub fn for_machine(machine: u16, bitness: Bitness) -> Option<Self> {
        match machine {
            MACHINE_I386 => Some(Processor::X86_32),
            MACHINE_AMD64 => Some(Processor::X86_64),
            MACHINE_ARM | MACHINE_ARMNT => Some(match bitness {
                Bitness::Pe32 => Processor::Arm32Le,
                Bitness::Pe32Plus => Processor::Arm64Le,
            }),
            MACHINE_ARM64 => Some(Processor::Arm64Le),
            _ => None,
        }
    }
}

/// A cross-reference from an instruction to the address it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Address of the referencing instruction
    pub from: u64,
    /// Referenced address
    pub to: u64,
}

/// Operand of a lifted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A constant the lifter recognised as an address inside the image
    Address(u64),
    /// Any other constant
    Value(u64),
    /// A register or memory operand
    Unknown,
}

impl Operand {
    /// The address carried by the operand, if it is address-valued.
    #[must_use]
    pub fn address(self) -> Option<u64> {
        match self {
            Operand::Address(address) => Some(address),
            Operand::Value(_) | Operand::Unknown => None,
        }
    }
}

/// The operations of the lifted form the loader looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlOp {
    /// Push of an operand onto the stack
    Push(Operand),
    /// Call through an operand
    Call(Operand),
    /// Anything else
    Other,
}

/// One lifted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IlInstruction {
    /// Address of the machine instruction
    pub address: u64,
    /// What it does
    pub op: IlOp,
}

impl IlInstruction {
    /// Create a lifted instruction.
    #[must_use]
    pub fn new(address: u64, op: IlOp) -> Self {
        IlInstruction { address, op }
    }
}

/// The analysis environment the loader reports to.
///
/// Query methods take `&self`; effect methods take `&mut self` and never fail, a host that
/// cannot honour an effect ignores it.
pub trait Host {
    /// Lift the routine containing `address` into its simplified instruction form, from the
    /// routine's start in execution order. `None` if the host cannot disassemble there.
    fn lift(&self, address: u64) -> Option<Vec<IlInstruction>>;

    /// Address of an already named symbol.
    fn address_of(&self, name: &str) -> Option<u64>;

    /// Every known reference whose target is `address`.
    fn references_to(&self, address: u64) -> Vec<Reference>;

    /// Mark `address` as the start of a function, optionally naming it and queueing it for
    /// disassembly.
    fn mark_function(&mut self, address: u64, name: Option<&str>, enqueue: bool);

    /// Name the symbol at `address`.
    fn set_name(&mut self, address: u64, name: &str, kind: SymbolKind);

    /// Mark `address` as the start of a NUL-terminated string.
    fn mark_text(&mut self, address: u64);

    /// Record that the instruction at `from` references `to`.
    fn add_reference(&mut self, from: u64, to: u64);

    /// Select the instruction set profile for the image.
    fn select_processor(&mut self, processor: Processor);
}
