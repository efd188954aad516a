//! Visual Basic 5/6 runtime structure recovery.
//!
//! A native-compiled VB program starts with a two-instruction stub: `push <VB header>` followed
//! by `call ThunRTMain`. [`VbDecompiler`] recognises that shape through the host's lifter, checks
//! the `VB5!` signature at the pushed address and then walks the structure graph hanging off the
//! header:
//!
//! ```text
//! VbHeader ─┬─ Sub Main
//!           ├─ ComRegistrationData ── ComRegistrationInfo
//!           └─ ProjectInfo ── ObjectTable ─┬─ ProjectInfo2 ── [PrivateObjectDescriptor] ── ObjectInfo
//!                                          └─ [PublicObjectDescriptor] ─┬─ ObjectInfo
//!                                                                       └─ method names
//! ObjectInfo ── OptionalObjectInfo ── [ControlInfo] ── EventInfo ── [handler]
//! ```
//!
//! Only forward fields are followed. Several records carry back-pointers to their parents which
//! are decoded but never walked, and an [`ObjectInfo`](structs::ObjectInfo) reachable from both a
//! private and a public descriptor is decoded once.
//!
//! Everything here is best-effort: a failed precondition returns `None` without touching the
//! host, and a record that fails to read only drops the part of the graph below it.

pub mod controls;
pub mod structs;

use std::collections::{HashMap, HashSet};

use uguid::Guid;

use crate::{
    analysis::host::{Host, IlOp, Operand},
    file::{parser::Parser, File},
    Result,
};

use controls::{find_control, ControlType};
use structs::{
    ComRegistrationData, ComRegistrationInfo, ControlInfo, EventInfo, ObjectInfo, ObjectTable,
    OptionalObjectInfo, PrivateObjectDescriptor, ProjectInfo, ProjectInfo2,
    PublicObjectDescriptor, VbHeader, VB_MAGIC,
};

/// A recovered event handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbEventHandler {
    /// Address of the handler
    pub address: u64,
    /// `<control>.<event>`, when the control class is known
    pub name: Option<String>,
}

/// A control placed on a form or user control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbControl {
    /// Name given in the designer
    pub name: Option<String>,
    /// Class GUID
    pub guid: Option<Guid>,
    /// Intrinsic class, when the GUID is a known one
    pub control_type: Option<&'static ControlType>,
    /// Non-null handler slots, in table order
    pub handlers: Vec<VbEventHandler>,
}

/// A form, module or class of the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VbObject {
    /// Object name
    pub name: Option<String>,
    /// Address of the object's [`ObjectInfo`](structs::ObjectInfo)
    pub object_info: Option<u64>,
    /// Method names
    pub methods: Vec<String>,
    /// Controls, for objects with a designer
    pub controls: Vec<VbControl>,
}

/// What the decompiler recovered from a VB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbProject {
    /// Address of the VB header
    pub header_address: u64,
    /// The decoded header
    pub header: VbHeader,
    /// Project description
    pub description: Option<String>,
    /// EXE name
    pub exe_name: Option<String>,
    /// Help file
    pub help_file: Option<String>,
    /// Project name
    pub project_name: Option<String>,
    /// Address of `Sub Main`
    pub sub_main: Option<u64>,
    /// COM registration data
    pub com_registration: Option<ComRegistrationData>,
    /// First COM registration record
    pub com_registration_info: Option<ComRegistrationInfo>,
    /// Project info
    pub project_info: Option<ProjectInfo>,
    /// Object table
    pub object_table: Option<ObjectTable>,
    /// Public objects, in descriptor order
    pub objects: Vec<VbObject>,
}

impl VbProject {
    /// Every named handler across all objects.
    pub fn handlers(&self) -> impl Iterator<Item = &VbEventHandler> {
        self.objects
            .iter()
            .flat_map(|object| object.controls.iter())
            .flat_map(|control| control.handlers.iter())
    }
}

/// Walks the VB runtime structures of one image.
pub struct VbDecompiler<'a> {
    file: &'a File,
    host: &'a mut dyn Host,
    visited: HashSet<u64>,
    decoded_controls: HashMap<u64, Vec<VbControl>>,
}

impl<'a> VbDecompiler<'a> {
    /// Create a decompiler reporting to `host`.
    pub fn new(file: &'a File, host: &'a mut dyn Host) -> Self {
        VbDecompiler {
            file,
            host,
            visited: HashSet::new(),
            decoded_controls: HashMap::new(),
        }
    }

    /// Recover the project whose loader stub starts at `entry_point`.
    ///
    /// Returns `None`, without any host effect, if the stub is not `push <address>; call`, or if
    /// the pushed address does not hold the `VB5!` signature.
    pub fn run(mut self, entry_point: u64) -> Option<VbProject> {
        let header_address = self.locate_header(entry_point)?;

        let header = match self
            .file
            .parser_at_va(header_address)
            .and_then(|mut parser| VbHeader::read(&mut parser))
        {
            Ok(header) => header,
            Err(error) => {
                log::debug!("VB header at 0x{header_address:X} truncated: {error}");
                return None;
            }
        };

        let [description, exe_name, help_file, project_name] =
            header.string_offsets().map(|offset| self.relative_text(header_address, offset));

        let sub_main = (header.sub_main != 0).then(|| u64::from(header.sub_main));
        if let Some(address) = sub_main {
            self.host.mark_function(address, Some("SubMain"), true);
        }

        let mut project = VbProject {
            header_address,
            header,
            description,
            exe_name,
            help_file,
            project_name,
            sub_main,
            com_registration: None,
            com_registration_info: None,
            project_info: None,
            object_table: None,
            objects: Vec::new(),
        };

        if project.header.com_register_data != 0 {
            let address = u64::from(project.header.com_register_data);
            match self.com_registration(address) {
                Ok((data, info)) => {
                    project.com_registration = Some(data);
                    project.com_registration_info = info;
                }
                Err(error) => log::debug!("VB COM registration at 0x{address:X}: {error}"),
            }
        }

        if project.header.project_data != 0 {
            let address = u64::from(project.header.project_data);
            if let Err(error) = self.project(address, &mut project) {
                log::debug!("VB project data at 0x{address:X}: {error}");
            }
        }

        Some(project)
    }

    /// The pushed address of a `push; call` entry stub holding `VB5!`.
    fn locate_header(&self, entry_point: u64) -> Option<u64> {
        let routine = self.host.lift(entry_point)?;

        let address = match routine.as_slice() {
            [first, second, ..] => match (first.op, second.op) {
                (IlOp::Push(Operand::Address(address)), IlOp::Call(_)) => address,
                _ => {
                    log::debug!("Entry point 0x{entry_point:X} is not a VB loader stub");
                    return None;
                }
            },
            _ => return None,
        };

        match self.file.read_at_va(address, VB_MAGIC.len()) {
            Ok(magic) if magic == VB_MAGIC => Some(address),
            _ => {
                log::debug!("No VB5! signature at 0x{address:X}");
                None
            }
        }
    }

    fn read<T>(&self, address: u64, decode: fn(&mut Parser) -> Result<T>) -> Result<T> {
        let mut parser = self.file.parser_at_va(address)?;
        decode(&mut parser)
    }

    fn text(&mut self, address: u64) -> Option<String> {
        match self.file.cstring_at_va(address) {
            Ok(text) => {
                self.host.mark_text(address);
                Some(text)
            }
            Err(error) => {
                log::debug!("VB string at 0x{address:X}: {error}");
                None
            }
        }
    }

    fn relative_text(&mut self, base: u64, offset: u32) -> Option<String> {
        if offset == 0 {
            return None;
        }
        self.text(base + u64::from(offset))
    }

    fn com_registration(
        &mut self,
        address: u64,
    ) -> Result<(ComRegistrationData, Option<ComRegistrationInfo>)> {
        let data = self.read(address, ComRegistrationData::read)?;

        for offset in [data.project_name, data.help_directory, data.project_description] {
            self.relative_text(address, offset);
        }

        let info = if data.reg_info != 0 {
            Some(self.read(address + u64::from(data.reg_info), ComRegistrationInfo::read)?)
        } else {
            None
        };

        Ok((data, info))
    }

    fn project(&mut self, address: u64, project: &mut VbProject) -> Result<()> {
        let info = self.read(address, ProjectInfo::read)?;
        let table_address = u64::from(info.object_table);
        project.project_info = Some(info);

        if table_address == 0 {
            return Ok(());
        }

        let table = self.read(table_address, ObjectTable::read)?;

        if table.project_info2 != 0 {
            if let Err(error) = self.private_objects(&table) {
                log::debug!("VB object tree at 0x{:X}: {error}", table.project_info2);
            }
        }

        if table.object_array != 0 {
            project.objects = self.public_objects(&table);
        }

        project.object_table = Some(table);
        Ok(())
    }

    fn private_objects(&mut self, table: &ObjectTable) -> Result<()> {
        let tree = self.read(u64::from(table.project_info2), ProjectInfo2::read)?;
        if tree.object_list == 0 {
            return Ok(());
        }

        let mut list = self.file.parser_at_va(u64::from(tree.object_list))?;
        let mut descriptors = Vec::new();
        for _ in 0..table.compiled_objects {
            descriptors.push(list.read_le::<u32>()?);
        }

        for descriptor in descriptors.into_iter().filter(|&address| address != 0) {
            match self.read(u64::from(descriptor), PrivateObjectDescriptor::read) {
                Ok(private) if private.object_info != 0 => {
                    self.object_info(u64::from(private.object_info));
                }
                Ok(_) => {}
                Err(error) => log::debug!("VB private object at 0x{descriptor:X}: {error}"),
            }
        }

        Ok(())
    }

    fn public_objects(&mut self, table: &ObjectTable) -> Vec<VbObject> {
        let base = u64::from(table.object_array);
        let mut objects = Vec::new();

        for index in 0..u64::from(table.total_objects) {
            let address = base + index * PublicObjectDescriptor::SIZE as u64;
            let descriptor = match self.read(address, PublicObjectDescriptor::read) {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    log::debug!("VB public object at 0x{address:X}: {error}");
                    break;
                }
            };

            let mut object = VbObject::default();
            if descriptor.object_info != 0 {
                let info = u64::from(descriptor.object_info);
                self.object_info(info);
                object.object_info = Some(info);
                object.controls = self.decoded_controls.get(&info).cloned().unwrap_or_default();
            }
            if descriptor.object_name != 0 {
                object.name = self.text(u64::from(descriptor.object_name));
            }
            if descriptor.method_names != 0 && descriptor.method_count != 0 {
                object.methods = self.method_names(&descriptor);
            }

            objects.push(object);
        }

        objects
    }

    fn method_names(&mut self, descriptor: &PublicObjectDescriptor) -> Vec<String> {
        let file = self.file;
        let Ok(mut list) = file.parser_at_va(u64::from(descriptor.method_names)) else {
            return Vec::new();
        };

        let mut names = Vec::new();
        for _ in 0..descriptor.method_count {
            let Ok(pointer) = list.read_le::<u32>() else {
                break;
            };
            if pointer != 0 {
                names.extend(self.text(u64::from(pointer)));
            }
        }
        names
    }

    /// Decode the object info at `address` once, stashing its controls for the public walk.
    fn object_info(&mut self, address: u64) {
        if !self.visited.insert(address) {
            return;
        }

        let controls = match self.object_controls(address) {
            Ok(controls) => controls,
            Err(error) => {
                log::debug!("VB object info at 0x{address:X}: {error}");
                Vec::new()
            }
        };
        self.decoded_controls.insert(address, controls);
    }

    fn object_controls(&mut self, address: u64) -> Result<Vec<VbControl>> {
        let file = self.file;
        let mut parser = file.parser_at_va(address)?;
        let info = ObjectInfo::read(&mut parser)?;
        if !info.has_optional(address) {
            return Ok(Vec::new());
        }

        let optional = OptionalObjectInfo::read(&mut parser)?;
        if optional.control_count == 0 || optional.controls == 0 {
            return Ok(Vec::new());
        }

        let mut records = file.parser_at_va(u64::from(optional.controls))?;
        let mut controls = Vec::new();
        for index in 0..optional.control_count {
            let control = match ControlInfo::read(&mut records) {
                Ok(control) => control,
                Err(error) => {
                    log::debug!("VB control {index} of object info at 0x{address:X}: {error}");
                    break;
                }
            };
            controls.push(self.control(&control));
        }

        Ok(controls)
    }

    fn control(&mut self, control: &ControlInfo) -> VbControl {
        let name = if control.name != 0 {
            self.text(u64::from(control.name))
        } else {
            None
        };

        let mut recovered = VbControl {
            name,
            guid: None,
            control_type: None,
            handlers: Vec::new(),
        };

        if control.guid == 0 || control.event_info == 0 {
            return recovered;
        }

        recovered.guid = self
            .file
            .parser_at_va(u64::from(control.guid))
            .and_then(|mut parser| parser.read_guid())
            .ok();
        recovered.control_type = recovered.guid.as_ref().and_then(find_control);

        let event_address = u64::from(control.event_info);
        match self.handlers(event_address, control.event_count, &recovered) {
            Ok(handlers) => recovered.handlers = handlers,
            Err(error) => log::debug!("VB event info at 0x{event_address:X}: {error}"),
        }

        recovered
    }

    fn handlers(
        &mut self,
        address: u64,
        count: u16,
        control: &VbControl,
    ) -> Result<Vec<VbEventHandler>> {
        let file = self.file;
        let mut parser = file.parser_at_va(address)?;
        let events = EventInfo::read(&mut parser)?;

        for stub in events.sink_stubs() {
            if stub != 0 {
                self.host.mark_function(u64::from(stub), None, true);
            }
        }

        let prefix = control
            .name
            .as_deref()
            .or(control.control_type.map(|kind| kind.name));

        let mut handlers = Vec::new();
        for index in 0..usize::from(count) {
            let pointer = parser.read_le::<u32>()?;
            if pointer == 0 {
                continue;
            }

            let address = u64::from(pointer);
            let name = match (prefix, control.control_type.and_then(|kind| kind.event(index))) {
                (Some(prefix), Some(event)) => Some(format!("{prefix}.{event}")),
                _ => None,
            };

            self.host.mark_function(address, name.as_deref(), true);
            handlers.push(VbEventHandler { address, name });
        }

        Ok(handlers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            host::IlInstruction,
            recorder::Recorder,
        },
        test::{ImageBuilder, SCN_CODE, SCN_DATA},
    };

    const BUTTON: [u8; 16] = [
        0xF2, 0x4E, 0xAD, 0x33, 0x99, 0x66, 0xCF, 0x11, 0xB7, 0x0C, 0x00, 0xAA, 0x00, 0x60, 0xD3,
        0x93,
    ];

    struct Layout {
        image: Vec<u8>,
        entry: u64,
        header: u64,
        sub_main: u64,
        click: u64,
        query_interface: u64,
    }

    /// A VB6 image with one form holding one `CommandButton` named `Command1` with a `Click`
    /// handler, reachable from both the private and the public descriptor.
    fn layout() -> Layout {
        layout_with(1, false)
    }

    /// [`layout`] with `public` descriptors sharing the form's object info. With `truncated`, the
    /// control array claims a second record that runs past the end of the image.
    fn layout_with(public: u16, truncated: bool) -> Layout {
        let mut b = ImageBuilder::pe32();
        let text = b.add_section(".text", 0x1000, SCN_CODE);
        let data = b.add_section(".data", 0x2000, SCN_DATA);
        b.entry_point(text);

        let va = |rva: u32| (0x0040_0000 + rva as u64) as u32;

        let header = data;
        let project = data + 0x100;
        let table = data + 0x400;
        let tree = data + 0x480;
        let private_list = data + 0x4C0;
        let private = data + 0x4D0;
        let public_array = data + 0x520;
        let object_info = data + 0x5A0;
        let control = if truncated { data + 0x2000 - 0x40 } else { data + 0x600 };
        let event_info = data + 0x640;
        let guid = data + 0x680;
        let strings = data + 0x700;

        let sub_main = text + 0x100;
        let click = text + 0x200;
        let stubs = text + 0x300;

        b.write(header, b"VB5!")
            .write_u32(header + 44, va(sub_main))
            .write_u32(header + 48, va(project))
            .write_u32(header + 100, 0x70)
            .write_cstring(header + 0x70, "Project1");

        b.write_u32(project + 4, va(table));

        b.write_u32(table + 8, va(tree))
            .write_u16(table + 42, public)
            .write_u16(table + 44, 1)
            .write_u32(table + 48, va(public_array));

        b.write_u32(tree + 16, va(private_list))
            .write_u32(private_list, va(private))
            .write_u32(private + 4, va(object_info));

        for index in 0..u32::from(public) {
            let descriptor = public_array + index * PublicObjectDescriptor::SIZE as u32;
            b.write_u32(descriptor, va(object_info))
                .write_u32(descriptor + 24, va(strings))
                .write_u32(descriptor + 28, 1)
                .write_u32(descriptor + 32, va(strings + 0x10));
        }
        b.write_u32(strings + 0x10, va(strings + 0x20))
            .write_cstring(strings, "Form1")
            .write_cstring(strings + 0x20, "DoWork")
            .write_cstring(strings + 0x30, "Command1");

        // constant pool elsewhere: the optional part follows
        b.write_u32(object_info + 52, va(data + 0x1000))
            .write_u32(object_info + 56 + 32, if truncated { 2 } else { 1 })
            .write_u32(object_info + 56 + 36, va(control));

        b.write_u16(control + 4, 2)
            .write_u32(control + 8, va(guid))
            .write_u32(control + 24, va(event_info))
            .write_u32(control + 32, va(strings + 0x30))
            .write(guid, &BUTTON);

        b.write_u32(event_info + 12, va(stubs))
            .write_u32(event_info + 16, va(stubs + 0x10))
            .write_u32(event_info + 20, va(stubs + 0x20))
            .write_u32(event_info + 24, va(click))
            .write_u32(event_info + 28, 0);

        Layout {
            image: b.build(),
            entry: b.va(text),
            header: b.va(header),
            sub_main: b.va(sub_main),
            click: b.va(click),
            query_interface: b.va(stubs),
        }
    }

    fn stub(entry: u64, second: IlOp, pushed: u64) -> Vec<IlInstruction> {
        vec![
            IlInstruction::new(entry, IlOp::Push(Operand::Address(pushed))),
            IlInstruction::new(entry + 5, second),
        ]
    }

    #[test]
    fn recovers_project() {
        let layout = layout();
        let file = File::from_mem(layout.image).unwrap();
        let mut host = Recorder::new().with_routine(
            layout.entry,
            stub(layout.entry, IlOp::Call(Operand::Unknown), layout.header),
        );

        let project = VbDecompiler::new(&file, &mut host)
            .run(layout.entry)
            .unwrap();

        assert_eq!(project.header_address, layout.header);
        assert_eq!(project.project_name.as_deref(), Some("Project1"));
        assert_eq!(project.description, None);
        assert_eq!(project.sub_main, Some(layout.sub_main));
        assert_eq!(project.objects.len(), 1);

        let form = &project.objects[0];
        assert_eq!(form.name.as_deref(), Some("Form1"));
        assert_eq!(form.methods, ["DoWork"]);
        assert_eq!(form.controls.len(), 1);

        let button = &form.controls[0];
        assert_eq!(button.name.as_deref(), Some("Command1"));
        assert_eq!(button.control_type.map(|kind| kind.name), Some("CommandButton"));
        assert_eq!(
            button.handlers,
            [VbEventHandler {
                address: layout.click,
                name: Some("Command1.Click".to_string()),
            }]
        );

        assert_eq!(host.name(layout.sub_main), Some("SubMain"));
        assert_eq!(host.name(layout.click), Some("Command1.Click"));
        assert!(host.is_function(layout.query_interface));
        assert!(host.strings().contains(&(layout.header + 0x70)));
        assert_eq!(project.handlers().count(), 1);
    }

    #[test]
    fn requires_push_then_call() {
        let layout = layout();
        let file = File::from_mem(layout.image).unwrap();
        let mut host = Recorder::new().with_routine(
            layout.entry,
            stub(
                layout.entry,
                IlOp::Push(Operand::Address(layout.header)),
                layout.header,
            ),
        );

        assert!(VbDecompiler::new(&file, &mut host).run(layout.entry).is_none());
        assert!(host.is_untouched());
    }

    #[test]
    fn requires_signature() {
        let layout = layout();
        let file = File::from_mem(layout.image).unwrap();
        let mut host = Recorder::new().with_routine(
            layout.entry,
            stub(layout.entry, IlOp::Call(Operand::Unknown), layout.header + 4),
        );

        assert!(VbDecompiler::new(&file, &mut host).run(layout.entry).is_none());
        assert!(host.is_untouched());
    }

    #[test]
    fn no_lift() {
        let layout = layout();
        let file = File::from_mem(layout.image).unwrap();
        let mut host = Recorder::new();

        assert!(VbDecompiler::new(&file, &mut host).run(layout.entry).is_none());
        assert!(host.is_untouched());
    }

    fn project(layout: Layout) -> (VbProject, Recorder) {
        let file = File::from_mem(layout.image).unwrap();
        let mut host = Recorder::new().with_routine(
            layout.entry,
            stub(layout.entry, IlOp::Call(Operand::Unknown), layout.header),
        );
        let project = VbDecompiler::new(&file, &mut host)
            .run(layout.entry)
            .unwrap();
        (project, host)
    }

    #[test]
    fn shared_object_info_keeps_controls() {
        let (project, _) = project(layout_with(2, false));

        assert_eq!(project.objects.len(), 2);
        assert_eq!(project.objects[0].object_info, project.objects[1].object_info);
        for form in &project.objects {
            assert_eq!(form.controls.len(), 1);
            assert_eq!(form.controls[0].name.as_deref(), Some("Command1"));
        }
        assert_eq!(project.handlers().count(), 2);
    }

    #[test]
    fn truncated_control_array_keeps_decoded_controls() {
        let layout = layout_with(1, true);
        let click = layout.click;
        let (project, host) = project(layout);

        let form = &project.objects[0];
        assert_eq!(form.controls.len(), 1);
        assert_eq!(form.controls[0].name.as_deref(), Some("Command1"));
        assert_eq!(host.name(click), Some("Command1.Click"));
    }
}
