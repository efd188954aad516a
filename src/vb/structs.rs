//! On-disk layouts of the Visual Basic 5/6 runtime structures.
//!
//! The VB compiler emits a private graph of structures that the runtime (`msvbvm50.dll`,
//! `msvbvm60.dll`) walks at startup. Every pointer in it is an absolute 32-bit address; string
//! fields prefixed `bsz` in the original headers are instead byte offsets from the start of the
//! structure that holds them.
//!
//! Fields that are only meaningful inside the IDE are decoded but carry no documentation beyond
//! their name.
//!
//! # Reference
//! - Alex Ionescu, "Visual Basic Image Internal Structure Format"
//! - `vb.idc` from the IDA Pro free files

use uguid::Guid;
use widestring::U16Str;

use crate::{file::parser::Parser, Result};

/// `VB5!`
pub const VB_MAGIC: [u8; 4] = *b"VB5!";

/// Read a fixed-size, NUL-padded ANSI field.
fn fixed_ansi<const N: usize>(parser: &mut Parser) -> Result<String> {
    let bytes = parser.read_array::<N>()?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(N);
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Read a fixed-size, NUL-padded UTF-16 field of `units` code units.
fn fixed_utf16(parser: &mut Parser, units: usize) -> Result<String> {
    let bytes = parser.read_bytes(units * 2)?;
    let chars: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    Ok(U16Str::from_slice(&chars).to_string_lossy())
}

/// `VB_HEADER`, located through the `push` at the image entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbHeader {
    /// `VB5!` for both VB5 and VB6
    pub magic: [u8; 4],
    /// Build of the runtime
    pub runtime_build: u16,
    /// Language extension DLL
    pub lang_dll: String,
    /// Secondary language extension DLL
    pub sec_lang_dll: String,
    /// Internal runtime revision
    pub runtime_revision: u16,
    /// LCID of the language DLL
    pub lcid: u32,
    /// LCID of the secondary language DLL
    pub sec_lcid: u32,
    /// Address of `Sub Main`, zero when the project starts with a form
    pub sub_main: u32,
    /// Address of the [`ProjectInfo`]
    pub project_data: u32,
    /// Control flags for ids below 32
    pub mdl_int_ctls: u32,
    /// Control flags for ids above 32
    pub mdl_int_ctls2: u32,
    /// Threading mode
    pub thread_flags: u32,
    /// Threads to support in the pool
    pub thread_count: u32,
    /// Number of forms
    pub form_count: u16,
    /// Number of external controls
    pub external_count: u16,
    /// Number of thunks to create
    pub thunk_count: u32,
    /// Address of the GUI table
    pub gui_table: u32,
    /// Address of the external component table
    pub external_component_table: u32,
    /// Address of the [`ComRegistrationData`]
    pub com_register_data: u32,
    /// Offset of the project description
    pub project_description: u32,
    /// Offset of the project EXE name
    pub project_exe_name: u32,
    /// Offset of the project help file
    pub project_help_file: u32,
    /// Offset of the project name
    pub project_name: u32,
}

impl VbHeader {
    /// Size of the on-disk record.
    pub const SIZE: usize = 104;

    /// Decode a header at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(VbHeader {
            magic: parser.read_array::<4>()?,
            runtime_build: parser.read_le::<u16>()?,
            lang_dll: fixed_ansi::<14>(parser)?,
            sec_lang_dll: fixed_ansi::<14>(parser)?,
            runtime_revision: parser.read_le::<u16>()?,
            lcid: parser.read_le::<u32>()?,
            sec_lcid: parser.read_le::<u32>()?,
            sub_main: parser.read_le::<u32>()?,
            project_data: parser.read_le::<u32>()?,
            mdl_int_ctls: parser.read_le::<u32>()?,
            mdl_int_ctls2: parser.read_le::<u32>()?,
            thread_flags: parser.read_le::<u32>()?,
            thread_count: parser.read_le::<u32>()?,
            form_count: parser.read_le::<u16>()?,
            external_count: parser.read_le::<u16>()?,
            thunk_count: parser.read_le::<u32>()?,
            gui_table: parser.read_le::<u32>()?,
            external_component_table: parser.read_le::<u32>()?,
            com_register_data: parser.read_le::<u32>()?,
            project_description: parser.read_le::<u32>()?,
            project_exe_name: parser.read_le::<u32>()?,
            project_help_file: parser.read_le::<u32>()?,
            project_name: parser.read_le::<u32>()?,
        })
    }

    /// The four header-relative string offsets: description, EXE name, help file, name.
    #[must_use]
    pub fn string_offsets(&self) -> [u32; 4] {
        [
            self.project_description,
            self.project_exe_name,
            self.project_help_file,
            self.project_name,
        ]
    }
}

/// `COM_REGISTRATION_DATA`; offsets are relative to its own start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComRegistrationData {
    /// Offset of the first [`ComRegistrationInfo`]
    pub reg_info: u32,
    /// Offset of the project name
    pub project_name: u32,
    /// Offset of the help directory
    pub help_directory: u32,
    /// Offset of the project description
    pub project_description: u32,
    /// Project CLSID
    pub project_clsid: Guid,
    /// LCID of the type library
    pub tlb_lcid: u32,
    #[allow(missing_docs)]
    pub unknown: u16,
    /// Type library major version
    pub tlb_major_version: u16,
    /// Type library minor version
    pub tlb_minor_version: u16,
}

impl ComRegistrationData {
    /// Size of the on-disk record.
    pub const SIZE: usize = 42;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ComRegistrationData {
            reg_info: parser.read_le::<u32>()?,
            project_name: parser.read_le::<u32>()?,
            help_directory: parser.read_le::<u32>()?,
            project_description: parser.read_le::<u32>()?,
            project_clsid: parser.read_guid()?,
            tlb_lcid: parser.read_le::<u32>()?,
            unknown: parser.read_le::<u16>()?,
            tlb_major_version: parser.read_le::<u16>()?,
            tlb_minor_version: parser.read_le::<u16>()?,
        })
    }
}

/// `COM_REGISTRATION_INFO`; offsets are relative to the owning [`ComRegistrationData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComRegistrationInfo {
    /// Offset of the next record, zero for the last
    pub next_object: u32,
    /// Offset of the object name
    pub object_name: u32,
    /// Offset of the object description
    pub object_description: u32,
    /// Instancing mode
    pub instancing: u32,
    /// Index of the object in the project
    pub object_id: u32,
    /// CLSID of the object
    pub object_clsid: Guid,
    /// Whether the object is an interface
    pub is_interface: u32,
    /// Offset of the object interface CLSID
    pub object_interface: u32,
    /// Offset of the events interface CLSID
    pub events_interface: u32,
    /// Whether the object raises events
    pub has_events: u32,
    /// `OLEMISC` flags
    pub misc_status: u32,
    /// Class type
    pub class_type: u8,
    /// Object type
    pub object_type: u8,
    /// Toolbox bitmap resource id
    pub toolbox_bitmap32: u16,
    /// Default icon resource id
    pub default_icon: u16,
    /// Whether the object is a designer
    pub is_designer: u16,
    /// Offset of the designer data
    pub designer_data: u32,
}

impl ComRegistrationInfo {
    /// Size of the on-disk record.
    pub const SIZE: usize = 68;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ComRegistrationInfo {
            next_object: parser.read_le::<u32>()?,
            object_name: parser.read_le::<u32>()?,
            object_description: parser.read_le::<u32>()?,
            instancing: parser.read_le::<u32>()?,
            object_id: parser.read_le::<u32>()?,
            object_clsid: parser.read_guid()?,
            is_interface: parser.read_le::<u32>()?,
            object_interface: parser.read_le::<u32>()?,
            events_interface: parser.read_le::<u32>()?,
            has_events: parser.read_le::<u32>()?,
            misc_status: parser.read_le::<u32>()?,
            class_type: parser.read_le::<u8>()?,
            object_type: parser.read_le::<u8>()?,
            toolbox_bitmap32: parser.read_le::<u16>()?,
            default_icon: parser.read_le::<u16>()?,
            is_designer: parser.read_le::<u16>()?,
            designer_data: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_PROJECT_INFO`, the project data the header points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Structure version
    pub version: u32,
    /// Address of the [`ObjectTable`]
    pub object_table: u32,
    #[allow(missing_docs)]
    pub null: u32,
    /// Start of code, unused
    pub code_start: u32,
    /// End of code, unused
    pub code_end: u32,
    /// Size of the VB object structures, unused
    pub data_size: u32,
    /// Address of the thread object pointer
    pub thread_space: u32,
    /// Address of the VBA exception handler
    pub vba_seh: u32,
    /// Address of the native code data
    pub native_code: u32,
    /// Project path and id string (before SP6)
    pub path_information: String,
    /// Address of the external table
    pub external_table: u32,
    /// Number of entries in the external table
    pub external_count: u32,
}

impl ProjectInfo {
    /// Code units in the path field.
    pub const PATH_UNITS: usize = 264;
    /// Size of the on-disk record.
    pub const SIZE: usize = 36 + Self::PATH_UNITS * 2 + 8;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ProjectInfo {
            version: parser.read_le::<u32>()?,
            object_table: parser.read_le::<u32>()?,
            null: parser.read_le::<u32>()?,
            code_start: parser.read_le::<u32>()?,
            code_end: parser.read_le::<u32>()?,
            data_size: parser.read_le::<u32>()?,
            thread_space: parser.read_le::<u32>()?,
            vba_seh: parser.read_le::<u32>()?,
            native_code: parser.read_le::<u32>()?,
            path_information: fixed_utf16(parser, Self::PATH_UNITS)?,
            external_table: parser.read_le::<u32>()?,
            external_count: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_OBJECT_TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTable {
    /// Always zero after compilation
    pub heap_link: u32,
    /// Address of the project exec COM object
    pub exec_project: u32,
    /// Address of the [`ProjectInfo2`]
    pub project_info2: u32,
    /// Always -1 after compilation
    pub reserved: u32,
    #[allow(missing_docs)]
    pub null: u32,
    /// Address of the in-memory project data
    pub project_object: u32,
    /// GUID of the object table
    pub object_guid: Guid,
    /// Compilation state flags
    pub compile_state: u16,
    /// Total objects in the project
    pub total_objects: u16,
    /// Compiled objects, equal to the total after compilation
    pub compiled_objects: u16,
    /// Objects in use
    pub objects_in_use: u16,
    /// Address of the [`PublicObjectDescriptor`] array
    pub object_array: u32,
    #[allow(missing_docs)]
    pub ide_flag: u32,
    #[allow(missing_docs)]
    pub ide_data: u32,
    #[allow(missing_docs)]
    pub ide_data2: u32,
    /// Address of the project name
    pub project_name: u32,
    /// LCID of the project
    pub lcid: u32,
    /// Alternate LCID of the project
    pub lcid2: u32,
    #[allow(missing_docs)]
    pub ide_data3: u32,
    /// Template version of the structure
    pub identifier: u32,
}

impl ObjectTable {
    /// Size of the on-disk record.
    pub const SIZE: usize = 84;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ObjectTable {
            heap_link: parser.read_le::<u32>()?,
            exec_project: parser.read_le::<u32>()?,
            project_info2: parser.read_le::<u32>()?,
            reserved: parser.read_le::<u32>()?,
            null: parser.read_le::<u32>()?,
            project_object: parser.read_le::<u32>()?,
            object_guid: parser.read_guid()?,
            compile_state: parser.read_le::<u16>()?,
            total_objects: parser.read_le::<u16>()?,
            compiled_objects: parser.read_le::<u16>()?,
            objects_in_use: parser.read_le::<u16>()?,
            object_array: parser.read_le::<u32>()?,
            ide_flag: parser.read_le::<u32>()?,
            ide_data: parser.read_le::<u32>()?,
            ide_data2: parser.read_le::<u32>()?,
            project_name: parser.read_le::<u32>()?,
            lcid: parser.read_le::<u32>()?,
            lcid2: parser.read_le::<u32>()?,
            ide_data3: parser.read_le::<u32>()?,
            identifier: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_PROJECT_INFO2`, the object tree info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo2 {
    /// Always zero after compilation
    pub heap_link: u32,
    /// Back-pointer to the [`ObjectTable`]
    pub object_table: u32,
    /// Always -1 after compilation
    pub reserved: u32,
    #[allow(missing_docs)]
    pub unused: u32,
    /// Address of the array of [`PrivateObjectDescriptor`] pointers
    pub object_list: u32,
    #[allow(missing_docs)]
    pub unused2: u32,
    /// Address of the project description
    pub project_description: u32,
    /// Address of the project help file
    pub project_help_file: u32,
    /// Always -1 after compilation
    pub reserved2: u32,
    /// Help context id from the project settings
    pub help_context_id: u32,
}

impl ProjectInfo2 {
    /// Size of the on-disk record.
    pub const SIZE: usize = 40;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ProjectInfo2 {
            heap_link: parser.read_le::<u32>()?,
            object_table: parser.read_le::<u32>()?,
            reserved: parser.read_le::<u32>()?,
            unused: parser.read_le::<u32>()?,
            object_list: parser.read_le::<u32>()?,
            unused2: parser.read_le::<u32>()?,
            project_description: parser.read_le::<u32>()?,
            project_help_file: parser.read_le::<u32>()?,
            reserved2: parser.read_le::<u32>()?,
            help_context_id: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_PRIVATE_OBJECT_DESCRIPTOR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateObjectDescriptor {
    #[allow(missing_docs)]
    pub heap_link: u32,
    /// Address of the [`ObjectInfo`]
    pub object_info: u32,
    #[allow(missing_docs)]
    pub reserved: u32,
    #[allow(missing_docs)]
    pub ide_data: [u32; 3],
    /// Address of an object list
    pub object_list: u32,
    #[allow(missing_docs)]
    pub ide_data2: u32,
    /// Address of a second object list
    pub object_list2: u32,
    #[allow(missing_docs)]
    pub ide_data3: [u32; 3],
    /// Object type flags
    pub object_type: u32,
    /// Template version of the structure
    pub identifier: u32,
}

impl PrivateObjectDescriptor {
    /// Size of the on-disk record.
    pub const SIZE: usize = 56;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let heap_link = parser.read_le::<u32>()?;
        let object_info = parser.read_le::<u32>()?;
        let reserved = parser.read_le::<u32>()?;
        let ide_data = [
            parser.read_le::<u32>()?,
            parser.read_le::<u32>()?,
            parser.read_le::<u32>()?,
        ];
        let object_list = parser.read_le::<u32>()?;
        let ide_data2 = parser.read_le::<u32>()?;
        let object_list2 = parser.read_le::<u32>()?;
        let ide_data3 = [
            parser.read_le::<u32>()?,
            parser.read_le::<u32>()?,
            parser.read_le::<u32>()?,
        ];

        Ok(PrivateObjectDescriptor {
            heap_link,
            object_info,
            reserved,
            ide_data,
            object_list,
            ide_data2,
            object_list2,
            ide_data3,
            object_type: parser.read_le::<u32>()?,
            identifier: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_PUBLIC_OBJECT_DESCRIPTOR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicObjectDescriptor {
    /// Address of the [`ObjectInfo`]
    pub object_info: u32,
    /// Always -1
    pub reserved: u32,
    /// Address of the public variable sizes
    pub public_bytes: u32,
    /// Address of the static variable sizes
    pub static_bytes: u32,
    /// Address of the public variables
    pub module_public: u32,
    /// Address of the static variables
    pub module_static: u32,
    /// Address of the object name
    pub object_name: u32,
    /// Number of methods
    pub method_count: u32,
    /// Address of the method name pointer array
    pub method_names: u32,
    /// Offset to copy static variables to
    pub static_vars: u32,
    /// Object type flags
    pub object_type: u32,
    #[allow(missing_docs)]
    pub null: u32,
}

impl PublicObjectDescriptor {
    /// Size of the on-disk record.
    pub const SIZE: usize = 48;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(PublicObjectDescriptor {
            object_info: parser.read_le::<u32>()?,
            reserved: parser.read_le::<u32>()?,
            public_bytes: parser.read_le::<u32>()?,
            static_bytes: parser.read_le::<u32>()?,
            module_public: parser.read_le::<u32>()?,
            module_static: parser.read_le::<u32>()?,
            object_name: parser.read_le::<u32>()?,
            method_count: parser.read_le::<u32>()?,
            method_names: parser.read_le::<u32>()?,
            static_vars: parser.read_le::<u32>()?,
            object_type: parser.read_le::<u32>()?,
            null: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_OBJECT_INFO`, the part shared by every object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Always 1 after compilation
    pub ref_count: u16,
    /// Index of the object in the public descriptor array
    pub object_index: u16,
    /// Address of the [`ObjectTable`]
    pub object_table: u32,
    #[allow(missing_docs)]
    pub ide_data: u32,
    /// Address of the [`PrivateObjectDescriptor`]
    pub private_object: u32,
    /// Always -1 after compilation
    pub reserved: u32,
    #[allow(missing_docs)]
    pub null: u32,
    /// Back-pointer to the [`PublicObjectDescriptor`]
    pub object: u32,
    /// Address of the in-memory project object
    pub project_data: u32,
    /// Number of methods
    pub method_count: u16,
    #[allow(missing_docs)]
    pub method_count2: u16,
    /// Address of the method array
    pub methods: u32,
    /// Number of constants in the pool
    pub constants: u16,
    /// Constants to allocate in the pool
    pub max_constants: u16,
    #[allow(missing_docs)]
    pub ide_data2: u32,
    #[allow(missing_docs)]
    pub ide_data3: u32,
    /// Address of the constant pool
    pub constant_pool: u32,
}

impl ObjectInfo {
    /// Size of the on-disk record.
    pub const SIZE: usize = 56;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ObjectInfo {
            ref_count: parser.read_le::<u16>()?,
            object_index: parser.read_le::<u16>()?,
            object_table: parser.read_le::<u32>()?,
            ide_data: parser.read_le::<u32>()?,
            private_object: parser.read_le::<u32>()?,
            reserved: parser.read_le::<u32>()?,
            null: parser.read_le::<u32>()?,
            object: parser.read_le::<u32>()?,
            project_data: parser.read_le::<u32>()?,
            method_count: parser.read_le::<u16>()?,
            method_count2: parser.read_le::<u16>()?,
            methods: parser.read_le::<u32>()?,
            constants: parser.read_le::<u16>()?,
            max_constants: parser.read_le::<u16>()?,
            ide_data2: parser.read_le::<u32>()?,
            ide_data3: parser.read_le::<u32>()?,
            constant_pool: parser.read_le::<u32>()?,
        })
    }

    /// Whether an [`OptionalObjectInfo`] follows this record.
    ///
    /// When only the base record exists, the constant pool starts right after it.
    #[must_use]
    pub fn has_optional(&self, address: u64) -> bool {
        u64::from(self.constant_pool) != address + Self::SIZE as u64
    }
}

/// The extension that follows an [`ObjectInfo`] for objects with a designer (forms,
/// user controls).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalObjectInfo {
    /// How many GUIDs to register, 2 for designers
    pub object_guids: u32,
    /// Address of the object GUID
    pub object_guid: u32,
    #[allow(missing_docs)]
    pub null: u32,
    /// Address of the interface GUID array
    pub object_type_guids_array: u32,
    /// Entries in the interface GUID array
    pub object_type_guids: u32,
    /// Usually equal to [`OptionalObjectInfo::controls`]
    pub controls2: u32,
    #[allow(missing_docs)]
    pub null2: u32,
    /// Address of a second object GUID array
    pub object_guid2: u32,
    /// Number of controls
    pub control_count: u32,
    /// Address of the [`ControlInfo`] array
    pub controls: u32,
    /// Number of events
    pub event_count: u16,
    /// Number of p-codes used by the object
    pub pcode_count: u16,
    /// Offset of the Initialize event in the event table
    pub initialize_event: u16,
    /// Offset of the Terminate event in the event table
    pub terminate_event: u16,
    /// Address of the event array
    pub events: u32,
    /// Address of the in-memory class object
    pub basic_class_object: u32,
    #[allow(missing_docs)]
    pub null3: u32,
    #[allow(missing_docs)]
    pub ide_data: u32,
}

impl OptionalObjectInfo {
    /// Size of the extension alone.
    pub const SIZE: usize = 64;

    /// Decode the extension at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(OptionalObjectInfo {
            object_guids: parser.read_le::<u32>()?,
            object_guid: parser.read_le::<u32>()?,
            null: parser.read_le::<u32>()?,
            object_type_guids_array: parser.read_le::<u32>()?,
            object_type_guids: parser.read_le::<u32>()?,
            controls2: parser.read_le::<u32>()?,
            null2: parser.read_le::<u32>()?,
            object_guid2: parser.read_le::<u32>()?,
            control_count: parser.read_le::<u32>()?,
            controls: parser.read_le::<u32>()?,
            event_count: parser.read_le::<u16>()?,
            pcode_count: parser.read_le::<u16>()?,
            initialize_event: parser.read_le::<u16>()?,
            terminate_event: parser.read_le::<u16>()?,
            events: parser.read_le::<u32>()?,
            basic_class_object: parser.read_le::<u32>()?,
            null3: parser.read_le::<u32>()?,
            ide_data: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_CONTROL_INFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    /// Control type
    pub control_type: u32,
    /// Number of event handlers the control supports
    pub event_count: u16,
    /// Offset in the memory struct to copy events to
    pub events_offset: u16,
    /// Address of the control's GUID
    pub guid: u32,
    /// Index of the control
    pub index: u32,
    #[allow(missing_docs)]
    pub null: u32,
    #[allow(missing_docs)]
    pub null2: u32,
    /// Address of the [`EventInfo`]
    pub event_info: u32,
    #[allow(missing_docs)]
    pub ide_data: u32,
    /// Address of the control name
    pub name: u32,
    /// Secondary index of the control
    pub index_copy: u32,
}

impl ControlInfo {
    /// Size of the on-disk record.
    pub const SIZE: usize = 40;

    /// Decode a record at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ControlInfo {
            control_type: parser.read_le::<u32>()?,
            event_count: parser.read_le::<u16>()?,
            events_offset: parser.read_le::<u16>()?,
            guid: parser.read_le::<u32>()?,
            index: parser.read_le::<u32>()?,
            null: parser.read_le::<u32>()?,
            null2: parser.read_le::<u32>()?,
            event_info: parser.read_le::<u32>()?,
            ide_data: parser.read_le::<u32>()?,
            name: parser.read_le::<u32>()?,
            index_copy: parser.read_le::<u32>()?,
        })
    }
}

/// `VB_EVENT_INFO`; the control's handler pointers follow it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    #[allow(missing_docs)]
    pub null: u32,
    /// Back-pointer to the [`ControlInfo`]
    pub controls_list: u32,
    /// Back-pointer to the owning [`ObjectInfo`]
    pub form_descriptor: u32,
    /// `IUnknown::QueryInterface` stub of the event sink
    pub query_interface: u32,
    /// `IUnknown::AddRef` stub of the event sink
    pub add_ref: u32,
    /// `IUnknown::Release` stub of the event sink
    pub release: u32,
}

impl EventInfo {
    /// Size of the fixed part.
    pub const SIZE: usize = 24;

    /// Decode the fixed part at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(EventInfo {
            null: parser.read_le::<u32>()?,
            controls_list: parser.read_le::<u32>()?,
            form_descriptor: parser.read_le::<u32>()?,
            query_interface: parser.read_le::<u32>()?,
            add_ref: parser.read_le::<u32>()?,
            release: parser.read_le::<u32>()?,
        })
    }

    /// The three `IUnknown` stubs, in vtable order.
    #[must_use]
    pub fn sink_stubs(&self) -> [u32; 3] {
        [self.query_interface, self.add_ref, self.release]
    }
}
