//! The loading driver.
//!
//! [`PeObject`] is the entry point of the crate: it decodes the headers of an image, runs every
//! applicable [`Analyzer`] in a fixed order and keeps what they decoded together with the
//! toolchain verdict.
//!
//! # Load Order
//!
//! 1. Directory passes: exports, imports (with import-based classification), exceptions, debug,
//!    resources, CLR header
//! 2. Borland package refinement, then CLR classification
//! 3. Processor selection from the machine field, or CIL for managed images
//! 4. The entry point is marked and named `EntryPoint`
//! 5. Enrichment passes: Visual Basic recovery, dialog procedure discovery
//!
//! A directory pass that fails is logged and its directory treated as absent; only header
//! failures reject an image.

use std::path::Path;

use crate::{
    analysis::{AnalysisContext, Analyzer, Host, Processor, Recorder},
    classify::{classify_borland, classify_clr, ToolchainClassification},
    config::LoaderConfig,
    directories::{ClrHeader, DebugDirectory, ExceptionTable, ExportTable, ImportTable},
    file::File,
    resources::ResourceTree,
    vb::VbProject,
    Result,
};

/// A loaded and analyzed PE image.
///
/// # Usage Examples
///
/// ```rust,no_run
/// use pescope::PeObject;
/// use std::path::Path;
///
/// let object = PeObject::from_file(Path::new("setup.exe"))?;
/// println!("Built with {}", object.classification());
///
/// if let Some(imports) = object.imports() {
///     for import in imports.imports() {
///         println!("{} at 0x{:x}", import.full_name(), import.iat_address);
///     }
/// }
/// # Ok::<(), pescope::Error>(())
/// ```
///
/// Loading against an environment that can disassemble:
///
/// ```rust,no_run
/// use pescope::{File, LoaderConfig, PeObject, Recorder};
///
/// let file = File::from_mem(std::fs::read("app.exe")?)?;
/// let mut host = Recorder::new();
/// let object = PeObject::load(file, &LoaderConfig::structural(), &mut host)?;
///
/// for (address, symbol) in host.symbols() {
///     println!("0x{address:x} {}", symbol.name);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PeObject {
    file: File,
    classification: ToolchainClassification,
    processor: Option<Processor>,
    exports: Option<ExportTable>,
    imports: Option<ImportTable>,
    exceptions: Option<ExceptionTable>,
    debug: Option<DebugDirectory>,
    resources: Option<ResourceTree>,
    clr: Option<ClrHeader>,
    vb_project: Option<VbProject>,
    dialog_procedures: Vec<u64>,
    recorder: Option<Recorder>,
}

impl PeObject {
    /// Load an image from a path with the default configuration.
    ///
    /// Host effects are kept in an internal [`Recorder`], see [`PeObject::recorder`].
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be mapped, or
    /// [`crate::Error::InvalidFormat`] if its headers are not a valid PE image.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_config(path, LoaderConfig::default())
    }

    /// Load an image from a path with a custom configuration.
    ///
    /// # Errors
    /// See [`PeObject::from_file`].
    pub fn from_file_with_config(path: &Path, config: LoaderConfig) -> Result<Self> {
        Self::with_recorder(File::from_file(path)?, config)
    }

    /// Load an image from a buffer with the default configuration.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer, or [`crate::Error::InvalidFormat`]
    /// if its headers are not a valid PE image.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        Self::from_mem_with_config(data, LoaderConfig::default())
    }

    /// Load an image from a buffer with a custom configuration.
    ///
    /// # Errors
    /// See [`PeObject::from_mem`].
    pub fn from_mem_with_config(data: Vec<u8>, config: LoaderConfig) -> Result<Self> {
        Self::with_recorder(File::from_mem(data)?, config)
    }

    fn with_recorder(file: File, config: LoaderConfig) -> Result<Self> {
        let mut recorder = Recorder::new();
        let mut object = Self::load(file, &config, &mut recorder)?;
        object.recorder = Some(recorder);
        Ok(object)
    }

    /// Analyze an already decoded image, reporting to `host`.
    ///
    /// # Errors
    /// Currently never fails once `file` is decoded; the `Result` leaves room for passes whose
    /// failure should reject the image.
    pub fn load(file: File, config: &LoaderConfig, host: &mut dyn Host) -> Result<Self> {
        let mut ctx = AnalysisContext::new(&file, *config);

        for analyzer in Analyzer::DIRECTORIES {
            run_pass(analyzer, &mut ctx, host);
        }

        if let Some(tree) = &ctx.resources {
            ctx.classification = classify_borland(ctx.classification, &file, tree);
        }
        if let Some(clr) = &ctx.clr {
            ctx.classification = classify_clr(ctx.classification, clr);
        }
        log::debug!("Toolchain: {}", ctx.classification);

        let processor = if ctx.clr.is_some() {
            Some(Processor::Cil)
        } else {
            Processor::for_machine(file.machine(), file.bitness())
        };
        match processor {
            Some(processor) => host.select_processor(processor),
            None => log::debug!("Unknown machine 0x{:04X}, no processor selected", file.machine()),
        }

        if let Some(entry_point) = file.entry_point() {
            host.mark_function(entry_point, Some("EntryPoint"), true);
        }

        for analyzer in Analyzer::ENRICHMENT {
            run_pass(analyzer, &mut ctx, host);
        }

        let AnalysisContext {
            classification,
            exports,
            imports,
            exceptions,
            debug,
            resources,
            clr,
            vb_project,
            dialog_procedures,
            ..
        } = ctx;

        Ok(PeObject {
            file,
            classification,
            processor,
            exports,
            imports,
            exceptions,
            debug,
            resources,
            clr,
            vb_project,
            dialog_procedures,
            recorder: None,
        })
    }

    /// The decoded image.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The toolchain verdict.
    #[must_use]
    pub fn classification(&self) -> ToolchainClassification {
        self.classification
    }

    /// The processor profile selected for the image, if the machine is known.
    #[must_use]
    pub fn processor(&self) -> Option<Processor> {
        self.processor
    }

    /// The export directory.
    #[must_use]
    pub fn exports(&self) -> Option<&ExportTable> {
        self.exports.as_ref()
    }

    /// The import directory.
    #[must_use]
    pub fn imports(&self) -> Option<&ImportTable> {
        self.imports.as_ref()
    }

    /// The exception directory.
    #[must_use]
    pub fn exceptions(&self) -> Option<&ExceptionTable> {
        self.exceptions.as_ref()
    }

    /// The debug directory.
    #[must_use]
    pub fn debug(&self) -> Option<&DebugDirectory> {
        self.debug.as_ref()
    }

    /// The resource tree.
    #[must_use]
    pub fn resources(&self) -> Option<&ResourceTree> {
        self.resources.as_ref()
    }

    /// The CLR header.
    #[must_use]
    pub fn clr(&self) -> Option<&ClrHeader> {
        self.clr.as_ref()
    }

    /// The recovered Visual Basic project.
    #[must_use]
    pub fn vb_project(&self) -> Option<&VbProject> {
        self.vb_project.as_ref()
    }

    /// Dialog procedures discovered through the dialog APIs.
    #[must_use]
    pub fn dialog_procedures(&self) -> &[u64] {
        &self.dialog_procedures
    }

    /// Host effects of the load, for objects built with [`PeObject::from_file`] or
    /// [`PeObject::from_mem`].
    #[must_use]
    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }
}

fn run_pass(analyzer: Analyzer, ctx: &mut AnalysisContext, host: &mut dyn Host) {
    if !analyzer.is_applicable(ctx) {
        return;
    }

    if let Err(error) = analyzer.run(ctx, host) {
        log::warn!("{analyzer} pass failed, directory ignored: {error}");
    }
}
