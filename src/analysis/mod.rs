//! Analyzers run over a decoded image, and the host they report to.
//!
//! Loading an image is a fixed sequence of [`Analyzer`] passes sharing one
//! [`AnalysisContext`]. Each pass first checks [`Analyzer::is_applicable`] against what earlier
//! passes produced, then decodes its part of the image into the context and reports what it
//! learned to the [`Host`].
//!
//! # Architecture
//!
//! - [`host`] - The [`Host`] trait and the lifted instruction form it exchanges
//! - [`recorder`] - [`Recorder`], an in-memory host
//! - [`wndproc`] - Dialog procedure discovery
//!
//! The sequence itself lives in [`crate::PeObject::load`].

pub mod host;
pub mod recorder;
pub mod wndproc;

pub use host::{Host, IlInstruction, IlOp, Operand, Processor, Reference, SymbolKind};
pub use recorder::{Recorder, Symbol};

use strum::{Display, EnumIter};

use crate::{
    classify::{classify_import, ToolchainClassification},
    config::LoaderConfig,
    directories::{ClrHeader, DebugDirectory, ExceptionTable, ExportTable, ImportTable},
    file::File,
    pe::DataDirectoryType,
    resources::ResourceTree,
    vb::{VbDecompiler, VbProject},
    Result,
};

/// State shared by the analyzers of one load.
pub struct AnalysisContext<'a> {
    /// The image being analyzed
    pub file: &'a File,
    /// Which analyzers are enabled
    pub config: LoaderConfig,
    /// Toolchain verdict so far
    pub classification: ToolchainClassification,
    /// Decoded export directory
    pub exports: Option<ExportTable>,
    /// Decoded import directory
    pub imports: Option<ImportTable>,
    /// Decoded exception directory
    pub exceptions: Option<ExceptionTable>,
    /// Decoded debug directory
    pub debug: Option<DebugDirectory>,
    /// Decoded resource tree
    pub resources: Option<ResourceTree>,
    /// Decoded CLR header
    pub clr: Option<ClrHeader>,
    /// Recovered Visual Basic project
    pub vb_project: Option<VbProject>,
    /// Dialog procedures found through the dialog APIs
    pub dialog_procedures: Vec<u64>,
}

impl<'a> AnalysisContext<'a> {
    /// An empty context for `file`.
    #[must_use]
    pub fn new(file: &'a File, config: LoaderConfig) -> Self {
        AnalysisContext {
            file,
            config,
            classification: ToolchainClassification::Unclassified,
            exports: None,
            imports: None,
            exceptions: None,
            debug: None,
            resources: None,
            clr: None,
            vb_project: None,
            dialog_procedures: Vec::new(),
        }
    }
}

/// One analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Analyzer {
    /// Export directory
    Exports,
    /// Import directory and import-based classification
    Imports,
    /// Exception directory
    Exceptions,
    /// Debug directory
    Debug,
    /// Resource tree
    Resources,
    /// CLR header
    Clr,
    /// Visual Basic runtime structures
    VisualBasic,
    /// Dialog procedures
    WndProc,
}

impl Analyzer {
    /// Passes decoding one data directory each, in load order.
    pub const DIRECTORIES: [Analyzer; 6] = [
        Analyzer::Exports,
        Analyzer::Imports,
        Analyzer::Exceptions,
        Analyzer::Debug,
        Analyzer::Resources,
        Analyzer::Clr,
    ];

    /// Passes that need classification and a lifting host, in load order.
    pub const ENRICHMENT: [Analyzer; 2] = [Analyzer::VisualBasic, Analyzer::WndProc];

    fn directory(self) -> Option<DataDirectoryType> {
        match self {
            Analyzer::Exports => Some(DataDirectoryType::Export),
            Analyzer::Imports => Some(DataDirectoryType::Import),
            Analyzer::Exceptions => Some(DataDirectoryType::Exception),
            Analyzer::Debug => Some(DataDirectoryType::Debug),
            Analyzer::Resources => Some(DataDirectoryType::Resource),
            Analyzer::Clr => Some(DataDirectoryType::ClrRuntimeHeader),
            Analyzer::VisualBasic | Analyzer::WndProc => None,
        }
    }

    fn is_enabled(self, config: &LoaderConfig) -> bool {
        match self {
            Analyzer::Exports => config.enable_exports,
            Analyzer::Imports => config.enable_imports,
            Analyzer::Exceptions => config.enable_exceptions,
            Analyzer::Debug => config.enable_debug,
            Analyzer::Resources => config.enable_resources,
            Analyzer::Clr => config.enable_clr,
            Analyzer::VisualBasic => config.enable_visual_basic,
            Analyzer::WndProc => config.enable_wndproc,
        }
    }

    /// Whether the pass should run given the configuration and what earlier passes produced.
    #[must_use]
    pub fn is_applicable(self, ctx: &AnalysisContext) -> bool {
        if !self.is_enabled(&ctx.config) {
            return false;
        }

        if let Some(kind) = self.directory() {
            return ctx.file.directory(kind).is_some();
        }

        let classification = ctx.classification;
        match self {
            Analyzer::VisualBasic => {
                classification.is_visual_basic() && ctx.file.entry_point().is_some()
            }
            Analyzer::WndProc => {
                ctx.imports.is_some()
                    && !(classification.is_borland()
                        || classification.is_dotnet()
                        || classification.is_visual_basic())
            }
            _ => false,
        }
    }

    /// Run the pass, storing what it decodes in `ctx` and reporting to `host`.
    ///
    /// # Errors
    /// Returns the decoder's error if the pass's directory is present but corrupt. Enrichment
    /// passes never fail.
    pub fn run(self, ctx: &mut AnalysisContext, host: &mut dyn Host) -> Result<()> {
        let file = ctx.file;

        match self {
            Analyzer::Exports => {
                ctx.exports = ExportTable::read(file)?;
                if let Some(table) = &ctx.exports {
                    for export in &table.exports {
                        host.mark_function(export.address, None, true);
                        host.set_name(export.address, &export.display_name(), SymbolKind::Export);
                    }
                }
            }
            Analyzer::Imports => {
                ctx.imports = ImportTable::read(file)?;
                if let Some(table) = &ctx.imports {
                    for module in &table.modules {
                        ctx.classification = classify_import(ctx.classification, &module.name);
                        for import in &module.imports {
                            let name = import.full_name();
                            log::trace!("Import {name} at 0x{:X}", import.iat_address);
                            host.set_name(import.iat_address, &name, SymbolKind::Import);
                        }
                    }
                }
            }
            Analyzer::Exceptions => {
                ctx.exceptions = ExceptionTable::read(file)?;
                if let Some(table) = &ctx.exceptions {
                    for root in table.roots() {
                        match file.rva_to_va(root) {
                            Ok(address) => {
                                log::trace!("Exception root at 0x{address:X}");
                                host.mark_function(address, None, true);
                            }
                            Err(error) => log::debug!("Exception root 0x{root:X}: {error}"),
                        }
                    }
                }
            }
            Analyzer::Debug => {
                ctx.debug = DebugDirectory::read(file)?;
                if let Some(codeview) = ctx.debug.as_ref().and_then(DebugDirectory::codeview) {
                    log::debug!("CodeView record for {}", codeview.path());
                }
            }
            Analyzer::Resources => {
                ctx.resources = ResourceTree::read(file, ctx.config.max_resource_depth)?;
            }
            Analyzer::Clr => {
                ctx.clr = ClrHeader::read(file)?;
            }
            Analyzer::VisualBasic => {
                if let Some(entry_point) = file.entry_point() {
                    ctx.vb_project = VbDecompiler::new(file, host).run(entry_point);
                }
            }
            Analyzer::WndProc => {
                if let Some(imports) = &ctx.imports {
                    ctx.dialog_procedures = wndproc::find_dialog_procedures(host, imports);
                }
            }
        }

        Ok(())
    }
}
