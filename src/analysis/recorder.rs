//! An in-memory [`Host`].
//!
//! [`Recorder`] answers queries from tables filled in up front (lifted routines, named
//! addresses, references) and keeps every effect the loader reports. Names it records are
//! themselves answerable through [`Host::address_of`], so imports named during loading can be
//! looked up by later analyzers the way a real symbol database would allow.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::analysis::host::{Host, IlInstruction, Processor, Reference, SymbolKind};

/// A named address as recorded by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The name
    pub name: String,
    /// What the name denotes
    pub kind: SymbolKind,
}

/// In-memory host that records effects.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    routines: BTreeMap<u64, Vec<IlInstruction>>,
    known_symbols: HashMap<String, u64>,
    known_references: HashMap<u64, Vec<Reference>>,

    functions: BTreeSet<u64>,
    symbols: BTreeMap<u64, Symbol>,
    strings: BTreeSet<u64>,
    references: Vec<Reference>,
    queue: Vec<u64>,
    processor: Option<Processor>,
}

impl Recorder {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer [`Host::lift`] with `instructions` for `address` and for every address they
    /// cover.
    #[must_use]
    pub fn with_routine(mut self, address: u64, instructions: Vec<IlInstruction>) -> Self {
        self.routines.insert(address, instructions);
        self
    }

    /// Answer [`Host::address_of`] for `name` with `address`.
    #[must_use]
    pub fn with_symbol(mut self, name: &str, address: u64) -> Self {
        self.known_symbols.insert(name.to_string(), address);
        self
    }

    /// Report a reference from `from` to `to` through [`Host::references_to`].
    #[must_use]
    pub fn with_reference(mut self, from: u64, to: u64) -> Self {
        self.known_references
            .entry(to)
            .or_default()
            .push(Reference { from, to });
        self
    }

    /// Every address marked as a function.
    #[must_use]
    pub fn functions(&self) -> &BTreeSet<u64> {
        &self.functions
    }

    /// Whether `address` was marked as a function.
    #[must_use]
    pub fn is_function(&self, address: u64) -> bool {
        self.functions.contains(&address)
    }

    /// The symbol recorded at `address`.
    #[must_use]
    pub fn symbol(&self, address: u64) -> Option<&Symbol> {
        self.symbols.get(&address)
    }

    /// The name recorded at `address`.
    #[must_use]
    pub fn name(&self, address: u64) -> Option<&str> {
        self.symbols.get(&address).map(|symbol| symbol.name.as_str())
    }

    /// Every recorded symbol, by address.
    #[must_use]
    pub fn symbols(&self) -> &BTreeMap<u64, Symbol> {
        &self.symbols
    }

    /// Every address marked as text.
    #[must_use]
    pub fn strings(&self) -> &BTreeSet<u64> {
        &self.strings
    }

    /// Every reference added during loading, in order.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Addresses queued for disassembly, in order.
    #[must_use]
    pub fn queue(&self) -> &[u64] {
        &self.queue
    }

    /// The selected processor profile.
    #[must_use]
    pub fn processor(&self) -> Option<Processor> {
        self.processor
    }

    /// Whether no effect has been recorded.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.functions.is_empty()
            && self.symbols.is_empty()
            && self.strings.is_empty()
            && self.references.is_empty()
            && self.queue.is_empty()
            && self.processor.is_none()
    }
}

impl Host for Recorder {
    fn lift(&self, address: u64) -> Option<Vec<IlInstruction>> {
        self.routines
            .range(..=address)
            .rev()
            .find(|(&start, routine)| {
                start == address || routine.iter().any(|insn| insn.address == address)
            })
            .map(|(_, routine)| routine.clone())
    }

    fn address_of(&self, name: &str) -> Option<u64> {
        self.known_symbols.get(name).copied().or_else(|| {
            self.symbols
                .iter()
                .find(|(_, symbol)| symbol.name == name)
                .map(|(address, _)| *address)
        })
    }

    fn references_to(&self, address: u64) -> Vec<Reference> {
        let mut references = self
            .known_references
            .get(&address)
            .cloned()
            .unwrap_or_default();
        references.extend(
            self.references
                .iter()
                .filter(|reference| reference.to == address),
        );
        references
    }

    fn mark_function(&mut self, address: u64, name: Option<&str>, enqueue: bool) {
        self.functions.insert(address);
        if let Some(name) = name {
            self.set_name(address, name, SymbolKind::Function);
        }
        if enqueue && !self.queue.contains(&address) {
            self.queue.push(address);
        }
    }

    fn set_name(&mut self, address: u64, name: &str, kind: SymbolKind) {
        self.symbols.insert(
            address,
            Symbol {
                name: name.to_string(),
                kind,
            },
        );
    }

    fn mark_text(&mut self, address: u64) {
        self.strings.insert(address);
    }

    fn add_reference(&mut self, from: u64, to: u64) {
        self.references.push(Reference { from, to });
    }

    fn select_processor(&mut self, processor: Processor) {
        self.processor = Some(processor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::host::{IlOp, Operand};

    #[test]
    fn queries_answer_preloaded_tables() {
        let recorder = Recorder::new()
            .with_routine(
                0x1000,
                vec![IlInstruction::new(0x1000, IlOp::Push(Operand::Value(1)))],
            )
            .with_symbol("user32.dll.DialogBoxParamA", 0x2000)
            .with_reference(0x1010, 0x2000);

        assert_eq!(recorder.lift(0x1000).map(|routine| routine.len()), Some(1));
        assert_eq!(recorder.lift(0x1001), None);
        assert_eq!(recorder.lift(0x0FFF), None);
        assert_eq!(recorder.address_of("user32.dll.DialogBoxParamA"), Some(0x2000));
        assert_eq!(
            recorder.references_to(0x2000),
            [Reference {
                from: 0x1010,
                to: 0x2000
            }]
        );
        assert!(recorder.is_untouched());
    }

    #[test]
    fn effects_are_recorded() {
        let mut recorder = Recorder::new();
        recorder.mark_function(0x1000, Some("EntryPoint"), true);
        recorder.mark_function(0x1000, None, true);
        recorder.set_name(0x3000, "kernel32.dll.Sleep", SymbolKind::Import);
        recorder.mark_text(0x4000);
        recorder.add_reference(0x1004, 0x3000);
        recorder.select_processor(Processor::X86_32);

        assert!(recorder.is_function(0x1000));
        assert_eq!(recorder.name(0x1000), Some("EntryPoint"));
        assert_eq!(recorder.queue(), [0x1000]);
        assert_eq!(recorder.symbol(0x3000).map(|s| s.kind), Some(SymbolKind::Import));
        assert_eq!(recorder.address_of("kernel32.dll.Sleep"), Some(0x3000));
        assert_eq!(recorder.references_to(0x3000).len(), 1);
        assert!(recorder.strings().contains(&0x4000));
        assert_eq!(recorder.processor(), Some(Processor::X86_32));
        assert!(!recorder.is_untouched());
    }
}
